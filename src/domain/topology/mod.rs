//! Topology aggregate
//!
//! Station, EVSE and Connector records plus the lookup contract the
//! transaction lifecycle depends on.

pub mod model;
pub mod repository;

pub use model::{Connector, ConnectorStatus, Evse, OperationalStatus, Station};
pub use repository::TopologyRepository;
