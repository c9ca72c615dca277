//! Asynchronous event notifier
//!
//! The lifecycle service hands every committed change to [`EventNotifier::notify`],
//! which never blocks and never fails. Records are routed by key (the
//! transaction id) onto one bounded lane per worker, so a transaction's events
//! are delivered one at a time in the order they were issued. Each worker
//! delivers through an [`EventPublisher`], retrying transient failures.
//! Records that cannot be delivered, or that find their lane full, end up in a
//! bounded dead-letter buffer.

use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::channel::{EventPublisher, EventRecord, PublishError};
use crate::domain::events::TransactionEvent;
use crate::shared::shutdown::ShutdownSignal;
use crate::shared::utills::{retry_with_backoff, RetryConfig};

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Total queued records across all lanes
    pub queue_capacity: usize,
    pub workers: usize,
    pub retry: RetryConfig,
    pub dead_letter_capacity: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            workers: 2,
            retry: RetryConfig::default(),
            dead_letter_capacity: 256,
        }
    }
}

/// A record that was never delivered
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub record: EventRecord,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

/// Fixed-size buffer; the oldest entry is evicted when full.
#[derive(Clone)]
struct DeadLetters {
    queue: Arc<Mutex<VecDeque<DeadLetter>>>,
    capacity: usize,
}

impl DeadLetters {
    fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    fn push(&self, record: EventRecord, error: String) {
        metrics::counter!("transaction_events_dead_lettered_total", "channel" => record.channel)
            .increment(1);
        if self.capacity == 0 {
            return;
        }
        let mut queue = self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        while queue.len() >= self.capacity {
            if let Some(evicted) = queue.pop_front() {
                warn!(key = %evicted.record.key, "Dead-letter buffer full, evicting oldest");
            }
        }
        queue.push_back(DeadLetter {
            record,
            error,
            failed_at: Utc::now(),
        });
    }

    fn snapshot(&self) -> Vec<DeadLetter> {
        let queue = self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        queue.iter().cloned().collect()
    }
}

/// Producer side. Cheap to clone.
#[derive(Clone)]
pub struct EventNotifier {
    lanes: Arc<[mpsc::Sender<EventRecord>]>,
    dead_letters: DeadLetters,
}

/// Worker pool handle, used to drain the lanes on shutdown
pub struct NotifierWorkers {
    handles: Vec<JoinHandle<()>>,
    stop: ShutdownSignal,
}

impl EventNotifier {
    /// Starts one worker per lane and returns the producer handle with them.
    pub fn start(
        config: NotifierConfig,
        publisher: Arc<dyn EventPublisher>,
    ) -> (Self, NotifierWorkers) {
        let worker_count = config.workers.max(1);
        let lane_capacity = (config.queue_capacity / worker_count).max(1);
        let dead_letters = DeadLetters::new(config.dead_letter_capacity);
        let stop = ShutdownSignal::new();

        let mut lanes = Vec::with_capacity(worker_count);
        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let (sender, receiver) = mpsc::channel(lane_capacity);
            let worker = Worker {
                id: worker_id,
                receiver,
                publisher: publisher.clone(),
                retry: config.retry.clone(),
                dead_letters: dead_letters.clone(),
                stop: stop.clone(),
            };
            lanes.push(sender);
            handles.push(tokio::spawn(worker.run()));
        }

        info!(
            workers = worker_count,
            lane_capacity,
            "Event notifier started"
        );

        (
            Self {
                lanes: lanes.into(),
                dead_letters,
            },
            NotifierWorkers { handles, stop },
        )
    }

    /// Enqueues an event for delivery. Returns immediately.
    pub fn notify(&self, event: TransactionEvent) {
        let record = EventRecord::new(event);
        let lane = &self.lanes[lane_for(&record.key, self.lanes.len())];
        match lane.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                lost(&record, "queue_full");
                self.dead_letters.push(record, "event queue full".to_string());
            }
            Err(TrySendError::Closed(record)) => lost(&record, "closed"),
        }
    }

    /// Snapshot of records that could not be delivered, oldest first
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.snapshot()
    }
}

/// Same key, same lane.
fn lane_for(key: &str, lanes: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % lanes as u64) as usize
}

fn lost(record: &EventRecord, reason: &'static str) {
    error!(
        channel = record.channel,
        key = %record.key,
        event_id = %record.id,
        reason,
        "Event dropped before delivery"
    );
    metrics::counter!("transaction_events_failed_total", "channel" => record.channel, "reason" => reason)
        .increment(1);
}

impl NotifierWorkers {
    /// Stops accepting new work once the lanes are empty and waits for the
    /// workers. Returns `false` if they did not finish within `timeout`.
    pub async fn shutdown(self, timeout: Duration) -> bool {
        self.stop.trigger();
        let join_all = async {
            for handle in self.handles {
                if let Err(err) = handle.await {
                    error!(error = %err, "Notifier worker panicked");
                }
            }
        };
        match tokio::time::timeout(timeout, join_all).await {
            Ok(()) => {
                info!("Event notifier drained");
                true
            }
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "Event notifier drain timed out");
                false
            }
        }
    }
}

struct Worker {
    id: usize,
    receiver: mpsc::Receiver<EventRecord>,
    publisher: Arc<dyn EventPublisher>,
    retry: RetryConfig,
    dead_letters: DeadLetters,
    stop: ShutdownSignal,
}

impl Worker {
    async fn run(mut self) {
        debug!(worker = self.id, "Notifier worker running");
        while let Some(record) = self.next_record().await {
            self.deliver(record).await;
        }
        debug!(worker = self.id, "Notifier worker stopped");
    }

    /// After a stop request only what is already queued is handed out.
    async fn next_record(&mut self) -> Option<EventRecord> {
        if self.stop.is_triggered() {
            return self.receiver.try_recv().ok();
        }
        tokio::select! {
            record = self.receiver.recv() => return record,
            _ = self.stop.wait() => {}
        }
        self.receiver.try_recv().ok()
    }

    async fn deliver(&self, record: EventRecord) {
        let publisher = self.publisher.clone();
        let result = retry_with_backoff(
            self.retry.clone(),
            || publisher.publish(&record),
            PublishError::is_retryable,
            "publish_transaction_event",
        )
        .await;

        match result {
            Ok(receipt) => {
                info!(
                    channel = %receipt.channel,
                    key = %receipt.key,
                    offset = receipt.offset,
                    event_type = record.event.event_type(),
                    "Event delivered"
                );
                metrics::counter!("transaction_events_published_total", "channel" => record.channel)
                    .increment(1);
            }
            Err(err) => {
                error!(
                    channel = record.channel,
                    key = %record.key,
                    event_id = %record.id,
                    error = %err,
                    "Event delivery failed, moving to dead letters"
                );
                metrics::counter!("transaction_events_failed_total", "channel" => record.channel, "reason" => "publish")
                    .increment(1);
                self.dead_letters.push(record, err.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::channel::{BroadcastEventBus, DeliveryReceipt};
    use crate::domain::events::{TRANSACTION_STARTED_CHANNEL, TRANSACTION_STOPPED_CHANNEL};
    use crate::domain::topology::Evse;
    use crate::domain::transaction::Transaction;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::{Notify, Semaphore};

    fn transaction(id: &str) -> Transaction {
        let evse = Evse::new(1, "ST-1", Decimal::from(22));
        Transaction::start(id, &evse, 1, "TOKEN", Utc::now())
    }

    fn event(id: &str) -> TransactionEvent {
        TransactionEvent::started(&transaction(id), Utc::now())
    }

    fn fast_config() -> NotifierConfig {
        NotifierConfig {
            queue_capacity: 8,
            workers: 2,
            retry: RetryConfig {
                max_attempts: 3,
                initial_delay: Duration::from_millis(1),
                backoff_multiplier: 2.0,
                max_delay: Duration::from_millis(5),
            },
            dead_letter_capacity: 2,
        }
    }

    fn receipt(record: &EventRecord, offset: u64) -> DeliveryReceipt {
        DeliveryReceipt {
            channel: record.channel.to_string(),
            key: record.key.clone(),
            offset,
        }
    }

    /// Fails the first `failures` calls with a retryable error and records
    /// the channel of every record it accepts.
    struct FlakyPublisher {
        failures: u32,
        calls: AtomicU32,
        delivered: Mutex<Vec<&'static str>>,
    }

    impl FlakyPublisher {
        fn failing(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                failures,
                calls: AtomicU32::new(0),
                delivered: Mutex::new(Vec::new()),
            })
        }

        fn delivered(&self) -> Vec<&'static str> {
            self.delivered.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventPublisher for FlakyPublisher {
        async fn publish(&self, record: &EventRecord) -> Result<DeliveryReceipt, PublishError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(PublishError::Unavailable("broker down".into()));
            }
            self.delivered.lock().unwrap().push(record.channel);
            Ok(receipt(record, u64::from(call)))
        }
    }

    /// Holds every publish until the test hands out a permit.
    struct GatedPublisher {
        entered: Notify,
        release: Semaphore,
        calls: AtomicU32,
    }

    #[async_trait]
    impl EventPublisher for GatedPublisher {
        async fn publish(&self, record: &EventRecord) -> Result<DeliveryReceipt, PublishError> {
            self.entered.notify_one();
            let permit = self.release.acquire().await.unwrap();
            permit.forget();
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(receipt(record, u64::from(call)))
        }
    }

    #[test]
    fn lane_choice_is_stable_per_key() {
        for lanes in 1..=4 {
            let lane = lane_for("TXN-1", lanes);
            assert!(lane < lanes);
            assert_eq!(lane_for("TXN-1", lanes), lane);
        }
        assert_eq!(lane_for("TXN-2", 1), 0);
    }

    #[tokio::test]
    async fn delivers_to_broadcast_bus() {
        let bus = BroadcastEventBus::new();
        let mut subscriber = bus.subscribe(&[]);
        let (notifier, workers) = EventNotifier::start(fast_config(), Arc::new(bus.clone()));

        notifier.notify(event("TXN-1"));
        let received = subscriber.recv().await.unwrap();
        assert_eq!(received.record.key, "TXN-1");
        assert_eq!(received.offset, 0);

        assert!(workers.shutdown(Duration::from_secs(1)).await);
        assert!(notifier.dead_letters().is_empty());
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let publisher = FlakyPublisher::failing(2);
        let (notifier, workers) = EventNotifier::start(fast_config(), publisher.clone());

        notifier.notify(event("TXN-1"));
        assert!(workers.shutdown(Duration::from_secs(1)).await);

        assert_eq!(publisher.calls.load(Ordering::SeqCst), 3);
        assert!(notifier.dead_letters().is_empty());
    }

    #[tokio::test]
    async fn retry_holds_back_later_events_of_the_same_transaction() {
        let publisher = FlakyPublisher::failing(1);
        let config = NotifierConfig {
            retry: RetryConfig {
                max_attempts: 3,
                initial_delay: Duration::from_millis(50),
                backoff_multiplier: 2.0,
                max_delay: Duration::from_millis(100),
            },
            ..fast_config()
        };
        let (notifier, workers) = EventNotifier::start(config, publisher.clone());

        let mut tx = transaction("TXN-1");
        notifier.notify(TransactionEvent::started(&tx, Utc::now()));
        tx.stop(Utc::now(), Some("User"), None).unwrap();
        notifier.notify(TransactionEvent::stopped(&tx, Utc::now()));
        assert!(workers.shutdown(Duration::from_secs(2)).await);

        assert_eq!(
            publisher.delivered(),
            vec![TRANSACTION_STARTED_CHANNEL, TRANSACTION_STOPPED_CHANNEL]
        );
        assert!(notifier.dead_letters().is_empty());
    }

    #[tokio::test]
    async fn exhausted_records_are_dead_lettered_and_bounded() {
        let publisher = FlakyPublisher::failing(u32::MAX);
        let (notifier, workers) = EventNotifier::start(fast_config(), publisher.clone());

        for id in ["TXN-1", "TXN-2", "TXN-3"] {
            notifier.notify(event(id));
        }
        assert!(workers.shutdown(Duration::from_secs(2)).await);

        assert_eq!(publisher.calls.load(Ordering::SeqCst), 9);
        let dead = notifier.dead_letters();
        assert_eq!(dead.len(), 2);
        assert!(dead.iter().all(|d| d.error.contains("broker down")));
    }

    #[tokio::test]
    async fn full_lane_sends_overflow_to_dead_letters() {
        let publisher = Arc::new(GatedPublisher {
            entered: Notify::new(),
            release: Semaphore::new(0),
            calls: AtomicU32::new(0),
        });
        let config = NotifierConfig {
            queue_capacity: 1,
            workers: 1,
            ..fast_config()
        };
        let (notifier, workers) = EventNotifier::start(config, publisher.clone());

        // First record is held inside the publisher, second fills the lane.
        notifier.notify(event("TXN-1"));
        publisher.entered.notified().await;
        notifier.notify(event("TXN-2"));
        notifier.notify(event("TXN-3"));

        let dead = notifier.dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].record.key, "TXN-3");
        assert!(dead[0].error.contains("queue full"));

        publisher.release.add_permits(2);
        assert!(workers.shutdown(Duration::from_secs(1)).await);
        assert_eq!(publisher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn notify_after_shutdown_does_not_panic() {
        let (notifier, workers) =
            EventNotifier::start(fast_config(), Arc::new(BroadcastEventBus::new()));
        assert!(workers.shutdown(Duration::from_secs(1)).await);
        notifier.notify(event("TXN-1"));
    }
}
