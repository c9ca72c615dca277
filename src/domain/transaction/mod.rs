//! Transaction aggregate
//!
//! Contains the Transaction entity, related types, and repository interface.

pub mod model;
pub mod repository;

pub use model::{
    energy_kwh, normalize_stop_reason, ChargingState, Transaction, TransactionEventType,
    DEFAULT_STOP_REASON, TRANSACTION_ID_PREFIX,
};
pub use repository::TransactionRepository;
