//! SeaORM implementation of MeterValueRepository

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use super::conversions::{decimal_from_db, parse_column};
use crate::domain::meter_value::{Measurand, MeterValue, MeterValueRepository};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::meter_value;

pub struct SeaOrmMeterValueRepository {
    db: DatabaseConnection,
}

impl SeaOrmMeterValueRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

pub(super) fn model_to_domain(m: meter_value::Model) -> DomainResult<MeterValue> {
    Ok(MeterValue {
        id: Some(m.id),
        transaction_id: m.transaction_id,
        timestamp: m.timestamp,
        measurand: parse_column(&m.measurand)?,
        value: decimal_from_db(m.value)?,
        unit: m.unit,
        phase: m.phase,
        location: m.location,
    })
}

#[async_trait]
impl MeterValueRepository for SeaOrmMeterValueRepository {
    async fn find_by_transaction(&self, transaction_id: &str) -> DomainResult<Vec<MeterValue>> {
        meter_value::Entity::find()
            .filter(meter_value::Column::TransactionId.eq(transaction_id))
            .order_by_asc(meter_value::Column::Timestamp)
            .order_by_asc(meter_value::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_to_domain)
            .collect()
    }

    async fn find_latest(
        &self,
        transaction_id: &str,
        measurand: Measurand,
    ) -> DomainResult<Option<MeterValue>> {
        meter_value::Entity::find()
            .filter(meter_value::Column::TransactionId.eq(transaction_id))
            .filter(meter_value::Column::Measurand.eq(measurand.as_str()))
            .order_by_desc(meter_value::Column::Timestamp)
            .order_by_desc(meter_value::Column::Id)
            .one(&self.db)
            .await?
            .map(model_to_domain)
            .transpose()
    }
}
