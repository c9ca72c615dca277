//! Repository tests against an in-memory SQLite database

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;

use super::{SeaOrmRepositoryProvider, SeaOrmUnitOfWorkFactory};
use crate::application::events::{BroadcastEventBus, EventNotifier, NotifierConfig};
use crate::application::transactions::{
    NewMeterValue, StartTransaction, StopTransaction, TimestampIdGenerator, TransactionService,
};
use crate::domain::meter_value::{Measurand, MeterValue};
use crate::domain::repositories::{RepositoryProvider, UnitOfWorkFactory};
use crate::domain::topology::{Connector, ConnectorStatus, Evse, Station};
use crate::domain::transaction::{ChargingState, Transaction, TransactionEventType};
use crate::domain::DomainError;
use crate::infrastructure::database::{init_database, run_migrations, DatabaseConfig};

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

async fn setup() -> (DatabaseConnection, SeaOrmRepositoryProvider, SeaOrmUnitOfWorkFactory) {
    let db = init_database(&DatabaseConfig::sqlite_in_memory())
        .await
        .unwrap();
    run_migrations(&db).await.unwrap();

    let repos = SeaOrmRepositoryProvider::new(db.clone());
    repos
        .topology()
        .save_station(Station::new("ST-1"))
        .await
        .unwrap();
    repos
        .topology()
        .save_evse(Evse::new(1, "ST-1", d("22")))
        .await
        .unwrap();
    let units = SeaOrmUnitOfWorkFactory::new(db.clone());
    (db, repos, units)
}

async fn insert(units: &SeaOrmUnitOfWorkFactory, id: &str, meter_start: Option<Decimal>) -> Transaction {
    let evse = Evse::new(1, "ST-1", d("22"));
    let tx = Transaction::start(id, &evse, 1, "TOKEN-A", Utc::now()).with_start_meter(meter_start);
    let mut uow = units.begin().await.unwrap();
    uow.insert_transaction(&tx).await.unwrap();
    uow.commit().await.unwrap();
    tx
}

#[tokio::test]
async fn topology_round_trips() {
    let (_db, repos, _units) = setup().await;
    let topology = repos.topology();

    let evse = topology.find_evse(1, "ST-1").await.unwrap().unwrap();
    assert_eq!(evse.max_power, d("22"));
    assert!(topology.find_evse(2, "ST-1").await.unwrap().is_none());
    assert!(topology.find_evse(1, "ST-2").await.unwrap().is_none());

    let mut connector = Connector::new(&evse, 1);
    connector.status = ConnectorStatus::Occupied;
    topology.save_connector(connector).await.unwrap();
    let connectors = topology.find_connectors_by_evse(1, "ST-1").await.unwrap();
    assert_eq!(connectors.len(), 1);
    assert_eq!(connectors[0].status, ConnectorStatus::Occupied);

    assert_eq!(topology.find_evses_by_station("ST-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn evse_for_unknown_station_is_rejected() {
    let (_db, repos, _units) = setup().await;
    let err = repos
        .topology()
        .save_evse(Evse::new(1, "ST-9", d("11")))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { entity: "Station", .. }));
}

#[tokio::test]
async fn transaction_round_trips_with_decimals() {
    let (_db, repos, units) = setup().await;
    insert(&units, "TXN-1", Some(d("1000.125"))).await;

    let mut uow = units.begin().await.unwrap();
    let mut tx = uow.find_transaction("TXN-1").await.unwrap().unwrap();
    tx.update_charging_state(ChargingState::Charging, Utc::now())
        .unwrap();
    tx.stop(Utc::now(), Some("User"), Some(d("5000.125"))).unwrap();
    uow.update_transaction(&mut tx).await.unwrap();
    uow.commit().await.unwrap();
    assert_eq!(tx.version, 1);

    let stored = repos.transactions().find_by_id("TXN-1").await.unwrap().unwrap();
    assert_eq!(stored.event_type, TransactionEventType::Ended);
    assert_eq!(stored.charging_state, Some(ChargingState::Charging));
    assert_eq!(stored.start_meter_value, Some(d("1000.125")));
    assert_eq!(stored.total_energy, Some(d("4")));
    assert_eq!(stored.stop_reason.as_deref(), Some("User"));
    assert_eq!(stored.version, 1);
}

#[tokio::test]
async fn uncommitted_work_is_rolled_back() {
    let (_db, repos, units) = setup().await;
    {
        let evse = Evse::new(1, "ST-1", d("22"));
        let tx = Transaction::start("TXN-1", &evse, 1, "TOKEN-A", Utc::now());
        let mut uow = units.begin().await.unwrap();
        uow.insert_transaction(&tx).await.unwrap();
    }
    assert!(repos.transactions().find_by_id("TXN-1").await.unwrap().is_none());
}

#[tokio::test]
async fn stale_version_is_rejected() {
    let (_db, repos, units) = setup().await;
    insert(&units, "TXN-1", None).await;

    let mut stale = repos.transactions().find_by_id("TXN-1").await.unwrap().unwrap();

    let mut uow = units.begin().await.unwrap();
    let mut fresh = uow.find_transaction("TXN-1").await.unwrap().unwrap();
    fresh.stop(Utc::now(), Some("User"), None).unwrap();
    uow.update_transaction(&mut fresh).await.unwrap();
    uow.commit().await.unwrap();

    let mut uow = units.begin().await.unwrap();
    stale
        .update_charging_state(ChargingState::Charging, Utc::now())
        .unwrap();
    let err = uow.update_transaction(&mut stale).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));
    drop(uow);

    let stored = repos.transactions().find_by_id("TXN-1").await.unwrap().unwrap();
    assert!(stored.is_ended());
}

#[tokio::test]
async fn open_transactions_are_ordered_by_start() {
    let (_db, repos, units) = setup().await;
    let evse = Evse::new(1, "ST-1", d("22"));
    let now = Utc::now();
    for (id, offset) in [("TXN-B", 10), ("TXN-A", 0), ("TXN-C", 20)] {
        let tx = Transaction::start(id, &evse, 1, "TOKEN", now + Duration::seconds(offset));
        let mut uow = units.begin().await.unwrap();
        uow.insert_transaction(&tx).await.unwrap();
        uow.commit().await.unwrap();
    }

    let mut uow = units.begin().await.unwrap();
    let mut b = uow.find_transaction("TXN-B").await.unwrap().unwrap();
    b.stop(Utc::now(), None, None).unwrap();
    uow.update_transaction(&mut b).await.unwrap();
    uow.commit().await.unwrap();

    let open: Vec<_> = repos
        .transactions()
        .find_open_by_station("ST-1")
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.transaction_id)
        .collect();
    assert_eq!(open, vec!["TXN-A", "TXN-C"]);
    assert_eq!(repos.transactions().find_by_station("ST-1").await.unwrap().len(), 3);
}

#[tokio::test]
async fn meter_values_are_stored_and_queried() {
    let (_db, repos, units) = setup().await;
    insert(&units, "TXN-1", None).await;
    let t0 = Utc::now();

    let mut uow = units.begin().await.unwrap();
    let first = uow
        .insert_meter_value(
            MeterValue::new("TXN-1", t0 + Duration::seconds(30), Measurand::EnergyActiveImportRegister, d("2.5"))
                .with_unit("kWh"),
        )
        .await
        .unwrap();
    uow.insert_meter_value(MeterValue::new(
        "TXN-1",
        t0,
        Measurand::EnergyActiveImportRegister,
        d("1000"),
    ))
    .await
    .unwrap();
    uow.insert_meter_value(
        MeterValue::new("TXN-1", t0 + Duration::seconds(60), Measurand::Voltage, d("229.9"))
            .with_phase("L1"),
    )
    .await
    .unwrap();
    uow.commit().await.unwrap();
    assert!(first.id.is_some());

    let all = repos.meter_values().find_by_transaction("TXN-1").await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].value, d("1000"));
    assert_eq!(all[2].phase.as_deref(), Some("L1"));

    let latest = repos
        .meter_values()
        .find_latest("TXN-1", Measurand::EnergyActiveImportRegister)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.energy_wh(), Some(d("2500")));
}

#[tokio::test]
async fn deleting_station_removes_dependents() {
    let (_db, repos, units) = setup().await;
    insert(&units, "TXN-1", None).await;
    let evse = Evse::new(1, "ST-1", d("22"));
    repos
        .topology()
        .save_connector(Connector::new(&evse, 1))
        .await
        .unwrap();

    repos.topology().delete_station("ST-1").await.unwrap();

    assert!(repos.topology().find_station("ST-1").await.unwrap().is_none());
    assert!(repos.topology().find_evse(1, "ST-1").await.unwrap().is_none());
    assert!(repos.transactions().find_by_id("TXN-1").await.unwrap().is_none());

    let err = repos.topology().delete_station("ST-1").await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
}

#[tokio::test]
async fn lifecycle_service_runs_on_a_single_sqlite_connection() {
    let (_db, repos, units) = setup().await;
    let bus = Arc::new(BroadcastEventBus::new());
    let (notifier, _workers) = EventNotifier::start(NotifierConfig::default(), bus);
    let service = TransactionService::new(
        Arc::new(repos),
        Arc::new(units),
        Arc::new(TimestampIdGenerator::new()),
        notifier,
    );

    let tx = service
        .start_transaction(StartTransaction {
            evse_id: 1,
            station_id: "ST-1".into(),
            connector_id: 1,
            id_token: "TOKEN-A".into(),
            meter_start: None,
        })
        .await
        .unwrap();
    let id = tx.transaction_id.as_str();

    let t0 = Utc::now();
    for (value, at) in [("1000", t0), ("5000", t0 + Duration::seconds(60))] {
        service
            .record_meter_value(
                id,
                NewMeterValue {
                    timestamp: Some(at),
                    measurand: Measurand::EnergyActiveImportRegister,
                    value: d(value),
                    unit: Some("Wh".into()),
                    phase: None,
                    location: None,
                },
            )
            .await
            .unwrap();
    }
    service
        .update_charging_state(id, ChargingState::Charging)
        .await
        .unwrap();

    // Stop reads the latest register before opening its unit of work;
    // with one pooled connection the other order would never finish.
    let stopped = tokio::time::timeout(
        StdDuration::from_secs(5),
        service.stop_transaction(id, StopTransaction::default()),
    )
    .await
    .expect("stop must not wait on its own connection")
    .unwrap();
    assert_eq!(stopped.total_energy, Some(d("4.000")));
    assert_eq!(stopped.charging_state, Some(ChargingState::Charging));

    let err = service
        .stop_transaction(id, StopTransaction::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidStateTransition { .. }));
    assert!(service.get_active_transactions("ST-1").await.unwrap().is_empty());
    assert_eq!(service.list_meter_values(id).await.unwrap().len(), 2);
}
