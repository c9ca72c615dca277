//! SeaORM implementation of TransactionRepository

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

use super::conversions::{decimal_to_db, optional_decimal_from_db, parse_column};
use crate::domain::transaction::{Transaction, TransactionRepository};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::transaction;

pub struct SeaOrmTransactionRepository {
    db: DatabaseConnection,
}

impl SeaOrmTransactionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

pub(super) fn model_to_domain(t: transaction::Model) -> DomainResult<Transaction> {
    Ok(Transaction {
        transaction_id: t.transaction_id,
        evse_id: t.evse_id,
        station_id: t.station_id,
        connector_id: t.connector_id,
        id_token: t.id_token,
        event_type: parse_column(&t.event_type)?,
        charging_state: t.charging_state.as_deref().map(parse_column).transpose()?,
        start_time: t.start_time,
        stop_time: t.stop_time,
        start_meter_value: optional_decimal_from_db(t.start_meter_value)?,
        stop_meter_value: optional_decimal_from_db(t.stop_meter_value)?,
        total_energy: optional_decimal_from_db(t.total_energy)?,
        stop_reason: t.stop_reason,
        version: t.version,
        created_at: t.created_at,
        updated_at: t.updated_at,
    })
}

pub(super) fn domain_to_active(tx: &Transaction) -> transaction::ActiveModel {
    transaction::ActiveModel {
        transaction_id: Set(tx.transaction_id.clone()),
        evse_id: Set(tx.evse_id),
        station_id: Set(tx.station_id.clone()),
        connector_id: Set(tx.connector_id),
        id_token: Set(tx.id_token.clone()),
        event_type: Set(tx.event_type.as_str().to_string()),
        charging_state: Set(tx.charging_state.map(|s| s.as_str().to_string())),
        start_time: Set(tx.start_time),
        stop_time: Set(tx.stop_time),
        start_meter_value: Set(tx.start_meter_value.map(decimal_to_db)),
        stop_meter_value: Set(tx.stop_meter_value.map(decimal_to_db)),
        total_energy: Set(tx.total_energy.map(decimal_to_db)),
        stop_reason: Set(tx.stop_reason.clone()),
        version: Set(tx.version),
        created_at: Set(tx.created_at),
        updated_at: Set(tx.updated_at),
    }
}

fn all_to_domain(models: Vec<transaction::Model>) -> DomainResult<Vec<Transaction>> {
    models.into_iter().map(model_to_domain).collect()
}

// ── TransactionRepository impl ──────────────────────────────────

#[async_trait]
impl TransactionRepository for SeaOrmTransactionRepository {
    async fn find_by_id(&self, transaction_id: &str) -> DomainResult<Option<Transaction>> {
        transaction::Entity::find_by_id(transaction_id.to_string())
            .one(&self.db)
            .await?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_by_station(&self, station_id: &str) -> DomainResult<Vec<Transaction>> {
        let models = transaction::Entity::find()
            .filter(transaction::Column::StationId.eq(station_id))
            .order_by_asc(transaction::Column::StartTime)
            .order_by_asc(transaction::Column::TransactionId)
            .all(&self.db)
            .await?;
        all_to_domain(models)
    }

    async fn find_open_by_station(&self, station_id: &str) -> DomainResult<Vec<Transaction>> {
        let models = transaction::Entity::find()
            .filter(transaction::Column::StationId.eq(station_id))
            .filter(transaction::Column::StopTime.is_null())
            .order_by_asc(transaction::Column::StartTime)
            .order_by_asc(transaction::Column::TransactionId)
            .all(&self.db)
            .await?;
        all_to_domain(models)
    }
}
