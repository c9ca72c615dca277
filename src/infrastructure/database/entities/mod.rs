//! Database entities module

pub mod connector;
pub mod evse;
pub mod meter_value;
pub mod station;
pub mod transaction;

pub use connector::Entity as Connector;
pub use evse::Entity as Evse;
pub use meter_value::Entity as MeterValue;
pub use station::Entity as Station;
pub use transaction::Entity as Transaction;
