//! Domain events
//!
//! Event types that represent facts about what happened to a transaction.
//! Delivery lives in `application::events`.

pub mod types;

pub use types::{
    ChargingStateChangedEvent, TransactionEvent, TransactionStartedEvent,
    TransactionStoppedEvent, ALL_CHANNELS, CHARGING_STATE_CHANGED_CHANNEL,
    TRANSACTION_STARTED_CHANNEL, TRANSACTION_STOPPED_CHANNEL,
};
