//! Transaction lifecycle events
//!
//! Immutable records built after a lifecycle change commits. Each kind is
//! routed to its own logical channel.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::transaction::{ChargingState, Transaction};
use crate::shared::time::{event_time, event_time_option, to_local};

pub const TRANSACTION_STARTED_CHANNEL: &str = "transaction.started";
pub const TRANSACTION_STOPPED_CHANNEL: &str = "transaction.stopped";
pub const CHARGING_STATE_CHANGED_CHANNEL: &str = "charging.state.changed";

pub const ALL_CHANNELS: [&str; 3] = [
    TRANSACTION_STARTED_CHANNEL,
    TRANSACTION_STOPPED_CHANNEL,
    CHARGING_STATE_CHANGED_CHANNEL,
];

/// Event types for lifecycle notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TransactionEvent {
    TransactionStarted(TransactionStartedEvent),
    TransactionStopped(TransactionStoppedEvent),
    ChargingStateChanged(ChargingStateChangedEvent),
}

impl TransactionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TransactionStarted(_) => "transaction_started",
            Self::TransactionStopped(_) => "transaction_stopped",
            Self::ChargingStateChanged(_) => "charging_state_changed",
        }
    }

    /// Logical channel the event is delivered to
    pub fn channel(&self) -> &'static str {
        match self {
            Self::TransactionStarted(_) => TRANSACTION_STARTED_CHANNEL,
            Self::TransactionStopped(_) => TRANSACTION_STOPPED_CHANNEL,
            Self::ChargingStateChanged(_) => CHARGING_STATE_CHANGED_CHANNEL,
        }
    }

    pub fn transaction_id(&self) -> &str {
        match self {
            Self::TransactionStarted(e) => &e.transaction_id,
            Self::TransactionStopped(e) => &e.transaction_id,
            Self::ChargingStateChanged(e) => &e.transaction_id,
        }
    }

    pub fn station_id(&self) -> &str {
        match self {
            Self::TransactionStarted(e) => &e.station_id,
            Self::TransactionStopped(e) => &e.station_id,
            Self::ChargingStateChanged(e) => &e.station_id,
        }
    }

    pub fn started(tx: &Transaction, now: DateTime<Utc>) -> Self {
        Self::TransactionStarted(TransactionStartedEvent {
            transaction_id: tx.transaction_id.clone(),
            evse_id: tx.evse_id,
            station_id: tx.station_id.clone(),
            connector_id: tx.connector_id,
            id_token: tx.id_token.clone(),
            charging_state: tx.charging_state,
            start_time: to_local(tx.start_time),
            event_time: to_local(now),
            event_description: "Charging transaction started.".to_string(),
        })
    }

    pub fn stopped(tx: &Transaction, now: DateTime<Utc>) -> Self {
        Self::TransactionStopped(TransactionStoppedEvent {
            transaction_id: tx.transaction_id.clone(),
            evse_id: tx.evse_id,
            station_id: tx.station_id.clone(),
            connector_id: tx.connector_id,
            charging_state: tx.charging_state,
            start_time: to_local(tx.start_time),
            stop_time: tx.stop_time.map(to_local),
            total_energy: tx.total_energy,
            stop_reason: tx.stop_reason.clone(),
            event_time: to_local(now),
            event_description: "Charging transaction stopped.".to_string(),
        })
    }

    pub fn charging_state_changed(
        tx: &Transaction,
        previous_state: Option<ChargingState>,
        now: DateTime<Utc>,
    ) -> Self {
        let from = previous_state.map_or("NONE", |s| s.as_str());
        let to = tx.charging_state.map_or("NONE", |s| s.as_str());
        Self::ChargingStateChanged(ChargingStateChangedEvent {
            transaction_id: tx.transaction_id.clone(),
            evse_id: tx.evse_id,
            station_id: tx.station_id.clone(),
            connector_id: tx.connector_id,
            previous_state,
            current_state: tx.charging_state,
            state_changed_time: to_local(tx.updated_at),
            event_time: to_local(now),
            event_description: format!("Charging state changed from {from} to {to}."),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStartedEvent {
    pub transaction_id: String,
    pub evse_id: i32,
    pub station_id: String,
    pub connector_id: i32,
    pub id_token: String,
    pub charging_state: Option<ChargingState>,
    #[serde(with = "event_time")]
    pub start_time: NaiveDateTime,
    #[serde(with = "event_time")]
    pub event_time: NaiveDateTime,
    pub event_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStoppedEvent {
    pub transaction_id: String,
    pub evse_id: i32,
    pub station_id: String,
    pub connector_id: i32,
    pub charging_state: Option<ChargingState>,
    #[serde(with = "event_time")]
    pub start_time: NaiveDateTime,
    #[serde(with = "event_time_option")]
    pub stop_time: Option<NaiveDateTime>,
    /// kWh
    #[serde(with = "rust_decimal::serde::float_option")]
    pub total_energy: Option<Decimal>,
    pub stop_reason: Option<String>,
    #[serde(with = "event_time")]
    pub event_time: NaiveDateTime,
    pub event_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingStateChangedEvent {
    pub transaction_id: String,
    pub evse_id: i32,
    pub station_id: String,
    pub connector_id: i32,
    pub previous_state: Option<ChargingState>,
    pub current_state: Option<ChargingState>,
    #[serde(with = "event_time")]
    pub state_changed_time: NaiveDateTime,
    #[serde(with = "event_time")]
    pub event_time: NaiveDateTime,
    pub event_description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::topology::Evse;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn tx() -> Transaction {
        let evse = Evse::new(1, "ST-1", d("22"));
        Transaction::start("TXN-42", &evse, 2, "TOKEN-A", Utc::now())
    }

    #[test]
    fn started_event_routes_to_started_channel() {
        let event = TransactionEvent::started(&tx(), Utc::now());
        assert_eq!(event.channel(), TRANSACTION_STARTED_CHANNEL);
        assert_eq!(event.transaction_id(), "TXN-42");
        assert_eq!(event.station_id(), "ST-1");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TransactionStarted");
        assert_eq!(json["data"]["idToken"], "TOKEN-A");
        assert_eq!(json["data"]["chargingState"], "IDLE");
        assert_eq!(json["data"]["connectorId"], 2);
        let start = json["data"]["startTime"].as_str().unwrap();
        assert!(NaiveDateTime::parse_from_str(start, "%Y-%m-%d %H:%M:%S").is_ok());
    }

    #[test]
    fn stopped_event_carries_energy_and_reason() {
        let mut t = tx().with_start_meter(Some(d("1000")));
        t.stop(Utc::now(), Some("User"), Some(d("5000"))).unwrap();
        let event = TransactionEvent::stopped(&t, Utc::now());
        assert_eq!(event.channel(), TRANSACTION_STOPPED_CHANNEL);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["data"]["totalEnergy"], serde_json::json!(4.0));
        assert_eq!(json["data"]["stopReason"], "User");
        assert!(json["data"]["stopTime"].is_string());
    }

    #[test]
    fn stopped_event_without_meters_has_null_energy() {
        let mut t = tx();
        t.stop(Utc::now(), None, None).unwrap();
        let json = serde_json::to_value(TransactionEvent::stopped(&t, Utc::now())).unwrap();
        assert!(json["data"]["totalEnergy"].is_null());
        assert_eq!(json["data"]["stopReason"], "Normal");
    }

    #[test]
    fn state_change_event_describes_transition() {
        let mut t = tx();
        let previous = t
            .update_charging_state(ChargingState::Charging, Utc::now())
            .unwrap();
        let event = TransactionEvent::charging_state_changed(&t, previous, Utc::now());
        assert_eq!(event.channel(), CHARGING_STATE_CHANGED_CHANNEL);
        match &event {
            TransactionEvent::ChargingStateChanged(e) => {
                assert_eq!(e.previous_state, Some(ChargingState::Idle));
                assert_eq!(e.current_state, Some(ChargingState::Charging));
                assert_eq!(e.event_description, "Charging state changed from IDLE to CHARGING.");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn events_deserialize_from_wire_shape() {
        let event = TransactionEvent::started(&tx(), Utc::now());
        let raw = serde_json::to_string(&event).unwrap();
        let back: TransactionEvent = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.transaction_id(), "TXN-42");
    }
}
