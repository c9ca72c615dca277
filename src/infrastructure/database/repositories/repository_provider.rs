//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::meter_value::MeterValueRepository;
use crate::domain::repositories::RepositoryProvider;
use crate::domain::topology::TopologyRepository;
use crate::domain::transaction::TransactionRepository;

use super::meter_value_repository::SeaOrmMeterValueRepository;
use super::topology_repository::SeaOrmTopologyRepository;
use super::transaction_repository::SeaOrmTransactionRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let evse = repos.topology().find_evse(1, "ST-1").await?;
/// let open = repos.transactions().find_open_by_station("ST-1").await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    topology: SeaOrmTopologyRepository,
    transactions: SeaOrmTransactionRepository,
    meter_values: SeaOrmMeterValueRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            topology: SeaOrmTopologyRepository::new(db.clone()),
            transactions: SeaOrmTransactionRepository::new(db.clone()),
            meter_values: SeaOrmMeterValueRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn topology(&self) -> &dyn TopologyRepository {
        &self.topology
    }

    fn transactions(&self) -> &dyn TransactionRepository {
        &self.transactions
    }

    fn meter_values(&self) -> &dyn MeterValueRepository {
        &self.meter_values
    }
}
