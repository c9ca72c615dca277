//! Meter value repository interface
//!
//! Samples are appended through a `UnitOfWork`; this trait is read-only.

use async_trait::async_trait;

use super::model::{Measurand, MeterValue};
use crate::domain::DomainResult;

#[async_trait]
pub trait MeterValueRepository: Send + Sync {
    /// All samples of a transaction, oldest first
    async fn find_by_transaction(&self, transaction_id: &str) -> DomainResult<Vec<MeterValue>>;
    /// Most recent sample of the given measurand
    async fn find_latest(
        &self,
        transaction_id: &str,
        measurand: Measurand,
    ) -> DomainResult<Option<MeterValue>>;
}
