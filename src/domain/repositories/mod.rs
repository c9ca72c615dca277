//! Repository traits for the domain layer
//!
//! Contains:
//! - `RepositoryProvider`: read access to all per-aggregate repositories
//! - `UnitOfWork`: one atomic write scope per lifecycle operation
//! - `DomainResult`: standard result type for domain operations

use async_trait::async_trait;

use super::meter_value::{MeterValue, MeterValueRepository};
use super::topology::{Evse, TopologyRepository};
use super::transaction::{Transaction, TransactionRepository};
pub use crate::shared::errors::DomainResult;

// ── RepositoryProvider ──────────────────────────────────────────

/// Provides access to all domain repositories.
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let evse = repos.topology().find_evse(1, "ST-1").await?;
///     let open = repos.transactions().find_open_by_station("ST-1").await?;
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn topology(&self) -> &dyn TopologyRepository;
    fn transactions(&self) -> &dyn TransactionRepository;
    fn meter_values(&self) -> &dyn MeterValueRepository;
}

// ── Unit of work ────────────────────────────────────────────────

/// Atomic write scope.
///
/// Nothing staged through a unit of work is visible to other readers until
/// `commit` succeeds. Dropping it without committing rolls everything back,
/// so an early `?` return can never leave partial state behind.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn find_evse(&mut self, evse_id: i32, station_id: &str) -> DomainResult<Option<Evse>>;

    async fn find_transaction(&mut self, transaction_id: &str)
        -> DomainResult<Option<Transaction>>;

    async fn insert_transaction(&mut self, transaction: &Transaction) -> DomainResult<()>;

    /// Persists `transaction` if the stored version still equals
    /// `transaction.version`, then bumps the version in place.
    /// A stale version fails with `DomainError::Conflict`.
    async fn update_transaction(&mut self, transaction: &mut Transaction) -> DomainResult<()>;

    /// Appends a sample and returns it with its assigned id.
    async fn insert_meter_value(&mut self, value: MeterValue) -> DomainResult<MeterValue>;

    async fn commit(self: Box<Self>) -> DomainResult<()>;
}

#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    async fn begin(&self) -> DomainResult<Box<dyn UnitOfWork>>;
}
