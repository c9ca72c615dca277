//! Application events (delivery)
//!
//! Event types are defined in `domain::events`. Queueing, retries and the
//! channel implementations live here.

pub mod channel;
pub mod consumer;
pub mod notifier;

pub use crate::domain::events::types::*;

pub use channel::{
    BroadcastEventBus, DeliveryReceipt, EventPublisher, EventRecord, EventSubscriber,
    PublishError, PublishedEvent,
};
pub use consumer::spawn_logging_consumer;
pub use notifier::{DeadLetter, EventNotifier, NotifierConfig, NotifierWorkers};
