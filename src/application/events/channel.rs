//! Event channel seam and the in-process broadcast implementation

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::events::TransactionEvent;

const DEFAULT_CAPACITY: usize = 1024;

/// Envelope handed to a publisher. Keyed by transaction id.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub id: Uuid,
    pub channel: &'static str,
    pub key: String,
    pub event: TransactionEvent,
    pub created_at: DateTime<Utc>,
}

impl EventRecord {
    pub fn new(event: TransactionEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: event.channel(),
            key: event.transaction_id().to_string(),
            event,
            created_at: Utc::now(),
        }
    }

    /// JSON body as it goes on the wire
    pub fn payload(&self) -> Result<String, PublishError> {
        Ok(serde_json::to_string(&self.event)?)
    }
}

/// Acknowledgement for a delivered record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub channel: String,
    pub key: String,
    pub offset: u64,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Channel unavailable: {0}")]
    Unavailable(String),

    #[error("Rejected by channel {channel}: {reason}")]
    Rejected { channel: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PublishError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PublishError::Unavailable(_))
    }
}

/// Outbound event channel
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, record: &EventRecord) -> Result<DeliveryReceipt, PublishError>;
}

/// Record as seen by a subscriber, stamped with its per-channel offset
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub offset: u64,
    pub record: EventRecord,
}

/// In-process publisher: one logical channel per topic on top of a single
/// broadcast sender. Offsets grow independently per topic.
#[derive(Clone)]
pub struct BroadcastEventBus {
    sender: broadcast::Sender<PublishedEvent>,
    offsets: Arc<DashMap<&'static str, u64>>,
    subscriber_count: Arc<AtomicUsize>,
}

impl BroadcastEventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            offsets: Arc::new(DashMap::new()),
            subscriber_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn next_offset(&self, channel: &'static str) -> u64 {
        let mut entry = self.offsets.entry(channel).or_insert(0);
        let offset = *entry;
        *entry += 1;
        offset
    }

    /// Subscribes to the given channels. An empty slice receives everything.
    pub fn subscribe(&self, channels: &[&str]) -> EventSubscriber {
        let receiver = self.sender.subscribe();
        let total = self.subscriber_count.fetch_add(1, Ordering::SeqCst) + 1;
        info!(total, ?channels, "New event subscriber");

        EventSubscriber {
            receiver,
            channels: channels.iter().map(|c| c.to_string()).collect(),
            subscriber_count: self.subscriber_count.clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriber_count.load(Ordering::SeqCst)
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for BroadcastEventBus {
    async fn publish(&self, record: &EventRecord) -> Result<DeliveryReceipt, PublishError> {
        let offset = self.next_offset(record.channel);
        let message = PublishedEvent {
            offset,
            record: record.clone(),
        };

        match self.sender.send(message) {
            Ok(count) => debug!(
                channel = record.channel,
                key = %record.key,
                offset,
                subscribers = count,
                "Event published"
            ),
            Err(_) => debug!(
                channel = record.channel,
                key = %record.key,
                offset,
                "Event published (no subscribers)"
            ),
        }

        Ok(DeliveryReceipt {
            channel: record.channel.to_string(),
            key: record.key.clone(),
            offset,
        })
    }
}

/// Topic-filtered receiving end of the bus
pub struct EventSubscriber {
    receiver: broadcast::Receiver<PublishedEvent>,
    channels: Vec<String>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventSubscriber {
    fn accepts(&self, channel: &str) -> bool {
        self.channels.is_empty() || self.channels.iter().any(|c| c == channel)
    }

    /// Next matching event; `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<PublishedEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) if self.accepts(msg.record.channel) => return Some(msg),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(missed = count, "Subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for EventSubscriber {
    fn drop(&mut self) {
        let prev = self.subscriber_count.fetch_sub(1, Ordering::SeqCst);
        info!(remaining = prev.saturating_sub(1), "Event subscriber disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::{CHARGING_STATE_CHANGED_CHANNEL, TRANSACTION_STARTED_CHANNEL};
    use crate::domain::topology::Evse;
    use crate::domain::transaction::{ChargingState, Transaction};
    use rust_decimal::Decimal;

    fn started(id: &str) -> EventRecord {
        let evse = Evse::new(1, "ST-1", Decimal::from(22));
        let tx = Transaction::start(id, &evse, 1, "TOKEN", Utc::now());
        EventRecord::new(TransactionEvent::started(&tx, Utc::now()))
    }

    fn state_changed(id: &str) -> EventRecord {
        let evse = Evse::new(1, "ST-1", Decimal::from(22));
        let mut tx = Transaction::start(id, &evse, 1, "TOKEN", Utc::now());
        let prev = tx
            .update_charging_state(ChargingState::Charging, Utc::now())
            .unwrap();
        EventRecord::new(TransactionEvent::charging_state_changed(&tx, prev, Utc::now()))
    }

    #[test]
    fn record_is_keyed_by_transaction_id() {
        let record = started("TXN-7");
        assert_eq!(record.key, "TXN-7");
        assert_eq!(record.channel, TRANSACTION_STARTED_CHANNEL);
        assert!(record.payload().unwrap().contains("\"transactionId\":\"TXN-7\""));
    }

    #[tokio::test]
    async fn offsets_are_per_channel() {
        let bus = BroadcastEventBus::new();
        let a = bus.publish(&started("TXN-1")).await.unwrap();
        let b = bus.publish(&started("TXN-2")).await.unwrap();
        let c = bus.publish(&state_changed("TXN-1")).await.unwrap();

        assert_eq!((a.offset, b.offset, c.offset), (0, 1, 0));
        assert_eq!(c.channel, CHARGING_STATE_CHANGED_CHANNEL);
        assert_eq!(a.key, "TXN-1");
    }

    #[tokio::test]
    async fn subscribers_only_see_their_channels() {
        let bus = BroadcastEventBus::new();
        let mut states = bus.subscribe(&[CHARGING_STATE_CHANGED_CHANNEL]);
        let mut all = bus.subscribe(&[]);
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(&started("TXN-1")).await.unwrap();
        bus.publish(&state_changed("TXN-1")).await.unwrap();

        let first = states.recv().await.unwrap();
        assert_eq!(first.record.channel, CHARGING_STATE_CHANGED_CHANNEL);

        assert_eq!(all.recv().await.unwrap().record.channel, TRANSACTION_STARTED_CHANNEL);
        assert_eq!(all.recv().await.unwrap().record.channel, CHARGING_STATE_CHANGED_CHANNEL);

        drop(states);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn only_unavailable_is_retryable() {
        assert!(PublishError::Unavailable("broker down".into()).is_retryable());
        assert!(!PublishError::Rejected {
            channel: "transaction.started".into(),
            reason: "too large".into()
        }
        .is_retryable());
    }
}
