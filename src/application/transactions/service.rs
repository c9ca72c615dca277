//! Transaction lifecycle service
//!
//! Every operation runs inside one unit of work. Events are emitted only
//! after the unit of work commits, and delivery problems never reach the
//! caller.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::id_generator::TransactionIdGenerator;
use crate::application::events::EventNotifier;
use crate::domain::events::TransactionEvent;
use crate::domain::meter_value::{Measurand, MeterValue};
use crate::domain::transaction::{ChargingState, Transaction};
use crate::domain::{DomainError, DomainResult, RepositoryProvider, UnitOfWorkFactory};

/// Start request
#[derive(Debug, Clone)]
pub struct StartTransaction {
    pub evse_id: i32,
    pub station_id: String,
    pub connector_id: i32,
    pub id_token: String,
    /// Wh
    pub meter_start: Option<Decimal>,
}

/// Stop request. Both fields are optional.
#[derive(Debug, Clone, Default)]
pub struct StopTransaction {
    pub stop_reason: Option<String>,
    /// Wh; falls back to the latest import register sample
    pub meter_stop: Option<Decimal>,
}

/// Sample to append to a transaction
#[derive(Debug, Clone)]
pub struct NewMeterValue {
    /// Defaults to now
    pub timestamp: Option<DateTime<Utc>>,
    pub measurand: Measurand,
    pub value: Decimal,
    pub unit: Option<String>,
    pub phase: Option<String>,
    pub location: Option<String>,
}

pub struct TransactionService {
    repos: Arc<dyn RepositoryProvider>,
    units: Arc<dyn UnitOfWorkFactory>,
    ids: Arc<dyn TransactionIdGenerator>,
    notifier: EventNotifier,
}

impl TransactionService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        units: Arc<dyn UnitOfWorkFactory>,
        ids: Arc<dyn TransactionIdGenerator>,
        notifier: EventNotifier,
    ) -> Self {
        Self {
            repos,
            units,
            ids,
            notifier,
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────

    pub async fn start_transaction(&self, cmd: StartTransaction) -> DomainResult<Transaction> {
        if cmd.station_id.trim().is_empty() {
            return Err(DomainError::DomainViolation("stationId must not be blank".into()));
        }
        if cmd.id_token.trim().is_empty() {
            return Err(DomainError::DomainViolation("idToken must not be blank".into()));
        }

        let mut uow = self.units.begin().await?;
        let evse = uow
            .find_evse(cmd.evse_id, &cmd.station_id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found(
                    "EVSE",
                    "evseId-stationId",
                    format!("{}-{}", cmd.evse_id, cmd.station_id),
                )
            })?;

        let transaction = Transaction::start(
            self.ids.next_id(),
            &evse,
            cmd.connector_id,
            cmd.id_token,
            Utc::now(),
        )
        .with_start_meter(cmd.meter_start);

        uow.insert_transaction(&transaction).await?;
        uow.commit().await?;

        info!(
            transaction_id = %transaction.transaction_id,
            station_id = %transaction.station_id,
            evse_id = transaction.evse_id,
            connector_id = transaction.connector_id,
            "Transaction started"
        );
        metrics::counter!("transactions_started_total").increment(1);
        self.notifier
            .notify(TransactionEvent::started(&transaction, Utc::now()));

        Ok(transaction)
    }

    pub async fn update_charging_state(
        &self,
        transaction_id: &str,
        new_state: ChargingState,
    ) -> DomainResult<Transaction> {
        let mut uow = self.units.begin().await?;
        let mut transaction = uow
            .find_transaction(transaction_id)
            .await?
            .ok_or_else(|| transaction_not_found(transaction_id))?;

        let previous = transaction.update_charging_state(new_state, Utc::now())?;
        uow.update_transaction(&mut transaction).await?;
        uow.commit().await?;

        info!(
            transaction_id,
            previous_state = ?previous,
            current_state = %new_state,
            "Charging state updated"
        );
        metrics::counter!("charging_state_changes_total", "state" => new_state.as_str())
            .increment(1);
        self.notifier.notify(TransactionEvent::charging_state_changed(
            &transaction,
            previous,
            Utc::now(),
        ));

        Ok(transaction)
    }

    pub async fn stop_transaction(
        &self,
        transaction_id: &str,
        cmd: StopTransaction,
    ) -> DomainResult<Transaction> {
        let meter_stop = match cmd.meter_stop {
            Some(value) => Some(value),
            None => self.latest_import_register(transaction_id).await?,
        };

        let mut uow = self.units.begin().await?;
        let mut transaction = uow
            .find_transaction(transaction_id)
            .await?
            .ok_or_else(|| transaction_not_found(transaction_id))?;

        transaction.stop(Utc::now(), cmd.stop_reason.as_deref(), meter_stop)?;
        uow.update_transaction(&mut transaction).await?;
        uow.commit().await?;

        info!(
            transaction_id,
            stop_reason = ?transaction.stop_reason,
            total_energy = ?transaction.total_energy,
            "Transaction stopped"
        );
        metrics::counter!("transactions_stopped_total").increment(1);
        self.notifier
            .notify(TransactionEvent::stopped(&transaction, Utc::now()));

        Ok(transaction)
    }

    async fn latest_import_register(&self, transaction_id: &str) -> DomainResult<Option<Decimal>> {
        let latest = self
            .repos
            .meter_values()
            .find_latest(transaction_id, Measurand::EnergyActiveImportRegister)
            .await?;
        Ok(latest.and_then(|sample| sample.energy_wh()))
    }

    // ── Queries ─────────────────────────────────────────────────

    /// Open transactions of a station, oldest start first.
    pub async fn get_active_transactions(&self, station_id: &str) -> DomainResult<Vec<Transaction>> {
        let mut open = self
            .repos
            .transactions()
            .find_open_by_station(station_id)
            .await?;
        open.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        debug!(station_id, count = open.len(), "Active transactions loaded");
        Ok(open)
    }

    pub async fn get_transaction(&self, transaction_id: &str) -> DomainResult<Transaction> {
        self.repos
            .transactions()
            .find_by_id(transaction_id)
            .await?
            .ok_or_else(|| transaction_not_found(transaction_id))
    }

    // ── Metering ────────────────────────────────────────────────

    /// Appends a sample. The transaction row is rewritten in the same unit
    /// of work, so a concurrent stop and this call cannot both succeed on
    /// the same version.
    pub async fn record_meter_value(
        &self,
        transaction_id: &str,
        sample: NewMeterValue,
    ) -> DomainResult<MeterValue> {
        let mut uow = self.units.begin().await?;
        let mut transaction = uow
            .find_transaction(transaction_id)
            .await?
            .ok_or_else(|| transaction_not_found(transaction_id))?;

        let mut value = MeterValue::new(
            transaction_id,
            sample.timestamp.unwrap_or_else(Utc::now),
            sample.measurand,
            sample.value,
        );
        value.unit = sample.unit;
        value.phase = sample.phase;
        value.location = sample.location;

        transaction.apply_meter_sample(&value)?;
        uow.update_transaction(&mut transaction).await?;
        let stored = uow.insert_meter_value(value).await?;
        uow.commit().await?;

        debug!(
            transaction_id,
            measurand = %stored.measurand,
            value = %stored.value,
            "Meter value recorded"
        );
        Ok(stored)
    }

    /// Samples of a transaction, oldest first.
    pub async fn list_meter_values(&self, transaction_id: &str) -> DomainResult<Vec<MeterValue>> {
        self.get_transaction(transaction_id).await?;
        let mut values = self
            .repos
            .meter_values()
            .find_by_transaction(transaction_id)
            .await?;
        values.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(values)
    }
}

fn transaction_not_found(transaction_id: &str) -> DomainError {
    DomainError::not_found("Transaction", "transactionId", transaction_id)
}
