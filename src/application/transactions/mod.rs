//! Transaction lifecycle use-cases

pub mod id_generator;
pub mod service;

pub use id_generator::{TimestampIdGenerator, TransactionIdGenerator, UuidIdGenerator};
pub use service::{NewMeterValue, StartTransaction, StopTransaction, TransactionService};
