//! Domain layer: entities, events and repository contracts

pub mod events;
pub mod meter_value;
pub mod repositories;
pub mod topology;
pub mod transaction;

pub use events::TransactionEvent;
pub use meter_value::{Measurand, MeterValue, MeterValueRepository};
pub use repositories::{DomainResult, RepositoryProvider, UnitOfWork, UnitOfWorkFactory};
pub use topology::{Connector, ConnectorStatus, Evse, OperationalStatus, Station, TopologyRepository};
pub use transaction::{ChargingState, Transaction, TransactionEventType, TransactionRepository};

pub use crate::shared::errors::DomainError;
