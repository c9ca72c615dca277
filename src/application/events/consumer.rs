//! Logging consumer for transaction events

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::channel::{BroadcastEventBus, EventSubscriber, PublishedEvent};
use crate::domain::events::{TransactionEvent, ALL_CHANNELS};
use crate::shared::shutdown::ShutdownSignal;

/// Subscribes to every transaction channel and logs what arrives.
pub fn spawn_logging_consumer(bus: &BroadcastEventBus, shutdown: ShutdownSignal) -> JoinHandle<()> {
    let subscriber = bus.subscribe(&ALL_CHANNELS);
    tokio::spawn(run(subscriber, shutdown))
}

async fn run(mut subscriber: EventSubscriber, shutdown: ShutdownSignal) {
    loop {
        tokio::select! {
            message = subscriber.recv() => match message {
                Some(message) => log_event(&message),
                None => break,
            },
            _ = shutdown.wait() => break,
        }
    }
    debug!("Event logging consumer stopped");
}

fn log_event(message: &PublishedEvent) {
    let record = &message.record;
    match &record.event {
        TransactionEvent::TransactionStarted(e) => info!(
            channel = record.channel,
            offset = message.offset,
            transaction_id = %e.transaction_id,
            station_id = %e.station_id,
            evse_id = e.evse_id,
            connector_id = e.connector_id,
            "Transaction started"
        ),
        TransactionEvent::TransactionStopped(e) => info!(
            channel = record.channel,
            offset = message.offset,
            transaction_id = %e.transaction_id,
            station_id = %e.station_id,
            total_energy = ?e.total_energy,
            stop_reason = ?e.stop_reason,
            "Transaction stopped"
        ),
        TransactionEvent::ChargingStateChanged(e) => info!(
            channel = record.channel,
            offset = message.offset,
            transaction_id = %e.transaction_id,
            previous_state = ?e.previous_state,
            current_state = ?e.current_state,
            "Charging state changed"
        ),
    }
    match record.payload() {
        Ok(body) => debug!(event_id = %record.id, %body, "Event payload"),
        Err(e) => warn!(event_id = %record.id, error = %e, "Event payload not serializable"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::channel::{EventPublisher, EventRecord};
    use crate::domain::topology::Evse;
    use crate::domain::transaction::Transaction;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::time::Duration;

    #[tokio::test]
    async fn consumer_stops_on_shutdown() {
        let bus = BroadcastEventBus::new();
        let shutdown = ShutdownSignal::new();
        let handle = spawn_logging_consumer(&bus, shutdown.clone());
        assert_eq!(bus.subscriber_count(), 1);

        let evse = Evse::new(1, "ST-1", Decimal::from(11));
        let tx = Transaction::start("TXN-1", &evse, 1, "TOKEN", Utc::now());
        bus.publish(&EventRecord::new(TransactionEvent::started(&tx, Utc::now())))
            .await
            .unwrap();

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bus.subscriber_count(), 0);
    }
}
