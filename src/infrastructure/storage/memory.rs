//! In-memory storage implementation
//!
//! Backs every repository contract with `DashMap`s. Units of work stage their
//! writes locally and apply them under a single commit lock after checking
//! the versions they read.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::meter_value::{Measurand, MeterValue, MeterValueRepository};
use crate::domain::repositories::{RepositoryProvider, UnitOfWork, UnitOfWorkFactory};
use crate::domain::topology::{Connector, Evse, Station, TopologyRepository};
use crate::domain::transaction::{Transaction, TransactionRepository};
use crate::domain::{DomainError, DomainResult};

type EvseKey = (String, i32);
type ConnectorKey = (String, i32, i32);

#[derive(Default)]
struct MemoryState {
    stations: DashMap<String, Station>,
    evses: DashMap<EvseKey, Evse>,
    connectors: DashMap<ConnectorKey, Connector>,
    transactions: DashMap<String, Transaction>,
    meter_values: DashMap<String, Vec<MeterValue>>,
    meter_value_counter: AtomicI64,
    commit_lock: Mutex<()>,
}

/// In-memory storage for development and testing
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    state: Arc<MemoryState>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn version_conflict(transaction_id: &str) -> DomainError {
    DomainError::Conflict(format!(
        "transaction {transaction_id} was modified concurrently"
    ))
}

// ── Topology ────────────────────────────────────────────────────

#[async_trait]
impl TopologyRepository for InMemoryStorage {
    async fn save_station(&self, station: Station) -> DomainResult<()> {
        self.state
            .stations
            .insert(station.station_id.clone(), station);
        Ok(())
    }

    async fn find_station(&self, station_id: &str) -> DomainResult<Option<Station>> {
        Ok(self.state.stations.get(station_id).map(|s| s.clone()))
    }

    async fn delete_station(&self, station_id: &str) -> DomainResult<()> {
        let _guard = self.state.commit_lock.lock().await;
        if self.state.stations.remove(station_id).is_none() {
            return Err(DomainError::not_found("Station", "stationId", station_id));
        }
        self.state.evses.retain(|(sid, _), _| sid != station_id);
        self.state.connectors.retain(|(sid, _, _), _| sid != station_id);

        let removed: Vec<String> = self
            .state
            .transactions
            .iter()
            .filter(|t| t.station_id == station_id)
            .map(|t| t.transaction_id.clone())
            .collect();
        for id in &removed {
            self.state.transactions.remove(id);
            self.state.meter_values.remove(id);
        }
        debug!(station_id, transactions = removed.len(), "Station deleted");
        Ok(())
    }

    async fn save_evse(&self, evse: Evse) -> DomainResult<()> {
        if !self.state.stations.contains_key(&evse.station_id) {
            return Err(DomainError::not_found("Station", "stationId", &evse.station_id));
        }
        self.state
            .evses
            .insert((evse.station_id.clone(), evse.evse_id), evse);
        Ok(())
    }

    async fn find_evse(&self, evse_id: i32, station_id: &str) -> DomainResult<Option<Evse>> {
        Ok(self
            .state
            .evses
            .get(&(station_id.to_string(), evse_id))
            .map(|e| e.clone()))
    }

    async fn find_evses_by_station(&self, station_id: &str) -> DomainResult<Vec<Evse>> {
        let mut evses: Vec<Evse> = self
            .state
            .evses
            .iter()
            .filter(|e| e.station_id == station_id)
            .map(|e| e.clone())
            .collect();
        evses.sort_by_key(|e| e.evse_id);
        Ok(evses)
    }

    async fn save_connector(&self, connector: Connector) -> DomainResult<()> {
        let evse_key = (connector.station_id.clone(), connector.evse_id);
        if !self.state.evses.contains_key(&evse_key) {
            return Err(DomainError::not_found(
                "EVSE",
                "evseId-stationId",
                format!("{}-{}", connector.evse_id, connector.station_id),
            ));
        }
        self.state.connectors.insert(
            (
                connector.station_id.clone(),
                connector.evse_id,
                connector.connector_id,
            ),
            connector,
        );
        Ok(())
    }

    async fn find_connectors_by_evse(
        &self,
        evse_id: i32,
        station_id: &str,
    ) -> DomainResult<Vec<Connector>> {
        let mut connectors: Vec<Connector> = self
            .state
            .connectors
            .iter()
            .filter(|c| c.evse_id == evse_id && c.station_id == station_id)
            .map(|c| c.clone())
            .collect();
        connectors.sort_by_key(|c| c.connector_id);
        Ok(connectors)
    }
}

// ── Transactions ────────────────────────────────────────────────

fn by_start(mut list: Vec<Transaction>) -> Vec<Transaction> {
    list.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a.transaction_id.cmp(&b.transaction_id))
    });
    list
}

#[async_trait]
impl TransactionRepository for InMemoryStorage {
    async fn find_by_id(&self, transaction_id: &str) -> DomainResult<Option<Transaction>> {
        Ok(self
            .state
            .transactions
            .get(transaction_id)
            .map(|t| t.clone()))
    }

    async fn find_by_station(&self, station_id: &str) -> DomainResult<Vec<Transaction>> {
        Ok(by_start(
            self.state
                .transactions
                .iter()
                .filter(|t| t.station_id == station_id)
                .map(|t| t.clone())
                .collect(),
        ))
    }

    async fn find_open_by_station(&self, station_id: &str) -> DomainResult<Vec<Transaction>> {
        Ok(by_start(
            self.state
                .transactions
                .iter()
                .filter(|t| t.station_id == station_id && t.stop_time.is_none())
                .map(|t| t.clone())
                .collect(),
        ))
    }
}

// ── Meter values ────────────────────────────────────────────────

#[async_trait]
impl MeterValueRepository for InMemoryStorage {
    async fn find_by_transaction(&self, transaction_id: &str) -> DomainResult<Vec<MeterValue>> {
        let mut values = self
            .state
            .meter_values
            .get(transaction_id)
            .map(|v| v.clone())
            .unwrap_or_default();
        values.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(values)
    }

    async fn find_latest(
        &self,
        transaction_id: &str,
        measurand: Measurand,
    ) -> DomainResult<Option<MeterValue>> {
        Ok(self.state.meter_values.get(transaction_id).and_then(|values| {
            values
                .iter()
                .filter(|v| v.measurand == measurand)
                .max_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)))
                .cloned()
        }))
    }
}

impl RepositoryProvider for InMemoryStorage {
    fn topology(&self) -> &dyn TopologyRepository {
        self
    }

    fn transactions(&self) -> &dyn TransactionRepository {
        self
    }

    fn meter_values(&self) -> &dyn MeterValueRepository {
        self
    }
}

// ── Unit of work ────────────────────────────────────────────────

struct StagedUpdate {
    expected_version: i32,
    transaction: Transaction,
}

/// Writes staged until commit; dropping discards them.
pub struct MemoryUnitOfWork {
    state: Arc<MemoryState>,
    inserts: Vec<Transaction>,
    updates: Vec<StagedUpdate>,
    meter_values: Vec<MeterValue>,
}

#[async_trait]
impl UnitOfWorkFactory for InMemoryStorage {
    async fn begin(&self) -> DomainResult<Box<dyn UnitOfWork>> {
        Ok(Box::new(MemoryUnitOfWork {
            state: self.state.clone(),
            inserts: Vec::new(),
            updates: Vec::new(),
            meter_values: Vec::new(),
        }))
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_evse(&mut self, evse_id: i32, station_id: &str) -> DomainResult<Option<Evse>> {
        Ok(self
            .state
            .evses
            .get(&(station_id.to_string(), evse_id))
            .map(|e| e.clone()))
    }

    async fn find_transaction(
        &mut self,
        transaction_id: &str,
    ) -> DomainResult<Option<Transaction>> {
        if let Some(staged) = self
            .updates
            .iter()
            .find(|u| u.transaction.transaction_id == transaction_id)
        {
            return Ok(Some(staged.transaction.clone()));
        }
        if let Some(staged) = self
            .inserts
            .iter()
            .find(|t| t.transaction_id == transaction_id)
        {
            return Ok(Some(staged.clone()));
        }
        Ok(self
            .state
            .transactions
            .get(transaction_id)
            .map(|t| t.clone()))
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> DomainResult<()> {
        let id = &transaction.transaction_id;
        if self.state.transactions.contains_key(id)
            || self.inserts.iter().any(|t| &t.transaction_id == id)
        {
            return Err(DomainError::Conflict(format!("transaction {id} already exists")));
        }
        self.inserts.push(transaction.clone());
        Ok(())
    }

    async fn update_transaction(&mut self, transaction: &mut Transaction) -> DomainResult<()> {
        let id = transaction.transaction_id.clone();

        if let Some(staged) = self.inserts.iter_mut().find(|t| t.transaction_id == id) {
            if staged.version != transaction.version {
                return Err(version_conflict(&id));
            }
            transaction.version += 1;
            *staged = transaction.clone();
            return Ok(());
        }

        if let Some(staged) = self
            .updates
            .iter_mut()
            .find(|u| u.transaction.transaction_id == id)
        {
            if staged.transaction.version != transaction.version {
                return Err(version_conflict(&id));
            }
            transaction.version += 1;
            staged.transaction = transaction.clone();
            return Ok(());
        }

        let stored_version = self
            .state
            .transactions
            .get(&id)
            .map(|t| t.version)
            .ok_or_else(|| DomainError::not_found("Transaction", "transactionId", &id))?;
        if stored_version != transaction.version {
            return Err(version_conflict(&id));
        }

        let expected_version = transaction.version;
        transaction.version += 1;
        self.updates.push(StagedUpdate {
            expected_version,
            transaction: transaction.clone(),
        });
        Ok(())
    }

    async fn insert_meter_value(&mut self, mut value: MeterValue) -> DomainResult<MeterValue> {
        let id = self.state.meter_value_counter.fetch_add(1, Ordering::SeqCst) + 1;
        value.id = Some(id);
        self.meter_values.push(value.clone());
        Ok(value)
    }

    async fn commit(self: Box<Self>) -> DomainResult<()> {
        let this = *self;
        let state = this.state;
        let _guard = state.commit_lock.lock().await;

        for update in &this.updates {
            let id = &update.transaction.transaction_id;
            match state.transactions.get(id) {
                Some(stored) if stored.version == update.expected_version => {}
                Some(_) => return Err(version_conflict(id)),
                None => {
                    return Err(DomainError::not_found("Transaction", "transactionId", id))
                }
            }
        }
        for insert in &this.inserts {
            if state.transactions.contains_key(&insert.transaction_id) {
                return Err(DomainError::Conflict(format!(
                    "transaction {} already exists",
                    insert.transaction_id
                )));
            }
        }

        for insert in this.inserts {
            state
                .transactions
                .insert(insert.transaction_id.clone(), insert);
        }
        for update in this.updates {
            state
                .transactions
                .insert(update.transaction.transaction_id.clone(), update.transaction);
        }
        for value in this.meter_values {
            state
                .meter_values
                .entry(value.transaction_id.clone())
                .or_default()
                .push(value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    async fn seeded() -> InMemoryStorage {
        let storage = InMemoryStorage::new();
        storage.save_station(Station::new("ST-1")).await.unwrap();
        storage.save_evse(Evse::new(1, "ST-1", d("22"))).await.unwrap();
        storage
    }

    async fn insert_tx(storage: &InMemoryStorage, id: &str) -> Transaction {
        let evse = storage.find_evse(1, "ST-1").await.unwrap().unwrap();
        let tx = Transaction::start(id, &evse, 1, "TOKEN", Utc::now());
        let mut uow = storage.begin().await.unwrap();
        uow.insert_transaction(&tx).await.unwrap();
        uow.commit().await.unwrap();
        tx
    }

    #[tokio::test]
    async fn evse_requires_station() {
        let storage = InMemoryStorage::new();
        let err = storage
            .save_evse(Evse::new(1, "ST-X", d("11")))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "Station", .. }));
    }

    #[tokio::test]
    async fn connectors_are_listed_per_evse() {
        let storage = seeded().await;
        let evse = storage.find_evse(1, "ST-1").await.unwrap().unwrap();
        storage.save_connector(Connector::new(&evse, 2)).await.unwrap();
        storage.save_connector(Connector::new(&evse, 1)).await.unwrap();

        let ids: Vec<_> = storage
            .find_connectors_by_evse(1, "ST-1")
            .await
            .unwrap()
            .iter()
            .map(|c| c.connector_id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn dropped_unit_of_work_leaves_no_trace() {
        let storage = seeded().await;
        let evse = storage.find_evse(1, "ST-1").await.unwrap().unwrap();
        {
            let mut uow = storage.begin().await.unwrap();
            let tx = Transaction::start("TXN-1", &evse, 1, "TOKEN", Utc::now());
            uow.insert_transaction(&tx).await.unwrap();
        }
        assert!(storage.find_by_id("TXN-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let storage = seeded().await;
        insert_tx(&storage, "TXN-1").await;

        let mut first = storage.begin().await.unwrap();
        let mut second = storage.begin().await.unwrap();
        let mut a = first.find_transaction("TXN-1").await.unwrap().unwrap();
        let mut b = second.find_transaction("TXN-1").await.unwrap().unwrap();

        a.stop(Utc::now(), Some("User"), None).unwrap();
        first.update_transaction(&mut a).await.unwrap();
        b.stop(Utc::now(), Some("Remote"), None).unwrap();
        second.update_transaction(&mut b).await.unwrap();

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let stored = storage.find_by_id("TXN-1").await.unwrap().unwrap();
        assert_eq!(stored.stop_reason.as_deref(), Some("User"));
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn open_transactions_exclude_stopped() {
        let storage = seeded().await;
        insert_tx(&storage, "TXN-1").await;
        insert_tx(&storage, "TXN-2").await;

        let mut uow = storage.begin().await.unwrap();
        let mut tx = uow.find_transaction("TXN-1").await.unwrap().unwrap();
        tx.stop(Utc::now(), None, None).unwrap();
        uow.update_transaction(&mut tx).await.unwrap();
        uow.commit().await.unwrap();

        let open = storage.find_open_by_station("ST-1").await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].transaction_id, "TXN-2");
        assert_eq!(storage.find_by_station("ST-1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn latest_sample_is_picked_by_timestamp() {
        let storage = seeded().await;
        insert_tx(&storage, "TXN-1").await;
        let t0 = Utc::now();

        let mut uow = storage.begin().await.unwrap();
        for (offset, value) in [(60, "300"), (0, "100"), (30, "200")] {
            uow.insert_meter_value(MeterValue::new(
                "TXN-1",
                t0 + Duration::seconds(offset),
                Measurand::EnergyActiveImportRegister,
                d(value),
            ))
            .await
            .unwrap();
        }
        uow.insert_meter_value(MeterValue::new(
            "TXN-1",
            t0 + Duration::seconds(90),
            Measurand::Voltage,
            d("230"),
        ))
        .await
        .unwrap();
        uow.commit().await.unwrap();

        let latest = storage
            .find_latest("TXN-1", Measurand::EnergyActiveImportRegister)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.value, d("300"));

        let all = storage.find_by_transaction("TXN-1").await.unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn deleting_station_cascades() {
        let storage = seeded().await;
        let evse = storage.find_evse(1, "ST-1").await.unwrap().unwrap();
        storage.save_connector(Connector::new(&evse, 1)).await.unwrap();
        insert_tx(&storage, "TXN-1").await;

        storage.delete_station("ST-1").await.unwrap();

        assert!(storage.find_station("ST-1").await.unwrap().is_none());
        assert!(storage.find_evses_by_station("ST-1").await.unwrap().is_empty());
        assert!(storage.find_connectors_by_evse(1, "ST-1").await.unwrap().is_empty());
        assert!(storage.find_by_id("TXN-1").await.unwrap().is_none());
    }
}
