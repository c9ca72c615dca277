//! Unit of work over a SeaORM database transaction
//!
//! The wrapped `DatabaseTransaction` rolls back when dropped, so only an
//! explicit `commit` makes writes visible.

use async_trait::async_trait;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use tracing::debug;

use super::conversions::decimal_to_db;
use super::meter_value_repository::model_to_domain as meter_value_to_domain;
use super::topology_repository::evse_to_domain;
use super::transaction_repository::{domain_to_active, model_to_domain};
use crate::domain::meter_value::MeterValue;
use crate::domain::repositories::{UnitOfWork, UnitOfWorkFactory};
use crate::domain::topology::Evse;
use crate::domain::transaction::Transaction;
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{evse, meter_value, transaction};

pub struct SeaOrmUnitOfWorkFactory {
    db: DatabaseConnection,
}

impl SeaOrmUnitOfWorkFactory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UnitOfWorkFactory for SeaOrmUnitOfWorkFactory {
    async fn begin(&self) -> DomainResult<Box<dyn UnitOfWork>> {
        let txn = self.db.begin().await?;
        Ok(Box::new(SeaOrmUnitOfWork { txn }))
    }
}

pub struct SeaOrmUnitOfWork {
    txn: DatabaseTransaction,
}

#[async_trait]
impl UnitOfWork for SeaOrmUnitOfWork {
    async fn find_evse(&mut self, evse_id: i32, station_id: &str) -> DomainResult<Option<Evse>> {
        evse::Entity::find_by_id((evse_id, station_id.to_string()))
            .one(&self.txn)
            .await?
            .map(evse_to_domain)
            .transpose()
    }

    async fn find_transaction(
        &mut self,
        transaction_id: &str,
    ) -> DomainResult<Option<Transaction>> {
        transaction::Entity::find_by_id(transaction_id.to_string())
            .one(&self.txn)
            .await?
            .map(model_to_domain)
            .transpose()
    }

    async fn insert_transaction(&mut self, tx: &Transaction) -> DomainResult<()> {
        debug!(transaction_id = %tx.transaction_id, "Inserting transaction");
        let exists = transaction::Entity::find_by_id(tx.transaction_id.clone())
            .count(&self.txn)
            .await?
            > 0;
        if exists {
            return Err(DomainError::Conflict(format!(
                "transaction {} already exists",
                tx.transaction_id
            )));
        }
        transaction::Entity::insert(domain_to_active(tx))
            .exec_without_returning(&self.txn)
            .await?;
        Ok(())
    }

    async fn update_transaction(&mut self, tx: &mut Transaction) -> DomainResult<()> {
        let expected_version = tx.version;
        let mut model = domain_to_active(tx);
        model.transaction_id = NotSet;
        model.version = Set(expected_version + 1);

        let result = transaction::Entity::update_many()
            .set(model)
            .filter(transaction::Column::TransactionId.eq(tx.transaction_id.as_str()))
            .filter(transaction::Column::Version.eq(expected_version))
            .exec(&self.txn)
            .await?;

        if result.rows_affected == 0 {
            let exists = transaction::Entity::find_by_id(tx.transaction_id.clone())
                .count(&self.txn)
                .await?
                > 0;
            return Err(if exists {
                DomainError::Conflict(format!(
                    "transaction {} was modified concurrently",
                    tx.transaction_id
                ))
            } else {
                DomainError::not_found("Transaction", "transactionId", &tx.transaction_id)
            });
        }

        tx.version = expected_version + 1;
        debug!(transaction_id = %tx.transaction_id, version = tx.version, "Transaction updated");
        Ok(())
    }

    async fn insert_meter_value(&mut self, value: MeterValue) -> DomainResult<MeterValue> {
        let model = meter_value::ActiveModel {
            id: NotSet,
            transaction_id: Set(value.transaction_id),
            timestamp: Set(value.timestamp),
            measurand: Set(value.measurand.as_str().to_string()),
            value: Set(decimal_to_db(value.value)),
            unit: Set(value.unit),
            phase: Set(value.phase),
            location: Set(value.location),
        };
        let stored = model.insert(&self.txn).await?;
        meter_value_to_domain(stored)
    }

    async fn commit(self: Box<Self>) -> DomainResult<()> {
        self.txn.commit().await?;
        Ok(())
    }
}
