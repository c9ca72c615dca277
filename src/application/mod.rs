//! Application layer - use cases and event delivery

pub mod events;
pub mod provisioning;
pub mod transactions;

pub use events::{
    BroadcastEventBus, EventNotifier, EventPublisher, NotifierConfig, NotifierWorkers,
};
pub use provisioning::provision_topology;
pub use transactions::{
    NewMeterValue, StartTransaction, StopTransaction, TimestampIdGenerator,
    TransactionIdGenerator, TransactionService, UuidIdGenerator,
};
