//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories, the unified RepositoryProvider and the
//! transactional unit of work.

mod conversions;
pub mod meter_value_repository;
pub mod repository_provider;
pub mod topology_repository;
pub mod transaction_repository;
pub mod unit_of_work;

pub use repository_provider::SeaOrmRepositoryProvider;
pub use unit_of_work::{SeaOrmUnitOfWork, SeaOrmUnitOfWorkFactory};

#[cfg(test)]
mod tests;
