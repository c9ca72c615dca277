//! Transaction repository interface
//!
//! Writes go through `UnitOfWork`; this trait covers the read side.

use async_trait::async_trait;

use super::model::Transaction;
use crate::domain::DomainResult;

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn find_by_id(&self, transaction_id: &str) -> DomainResult<Option<Transaction>>;
    async fn find_by_station(&self, station_id: &str) -> DomainResult<Vec<Transaction>>;
    /// Transactions of the station without a stop time, oldest start first
    async fn find_open_by_station(&self, station_id: &str) -> DomainResult<Vec<Transaction>>;
}
