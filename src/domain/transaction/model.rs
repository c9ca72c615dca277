//! Transaction domain entity
//!
//! Two orthogonal dimensions evolve on a transaction: the lifecycle phase
//! (`event_type`: STARTED → UPDATED* → ENDED) and the externally driven
//! `charging_state`. Once `stop_time` is set both are frozen.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::meter_value::{Measurand, MeterValue};
use crate::domain::topology::Evse;
use crate::domain::{DomainError, DomainResult};

pub const TRANSACTION_ID_PREFIX: &str = "TXN-";
pub const DEFAULT_STOP_REASON: &str = "Normal";
pub const STOP_REASON_USER: &str = "User";

/// Decimal places kept for meter readings and energy totals
pub const METER_SCALE: u32 = 3;

/// Lifecycle phase of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionEventType {
    Started,
    Updated,
    Ended,
}

impl TransactionEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "STARTED",
            Self::Updated => "UPDATED",
            Self::Ended => "ENDED",
        }
    }
}

impl FromStr for TransactionEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STARTED" => Ok(Self::Started),
            "UPDATED" => Ok(Self::Updated),
            "ENDED" => Ok(Self::Ended),
            other => Err(format!("unknown transaction event type: {other}")),
        }
    }
}

/// Charging state reported for an open session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargingState {
    Charging,
    #[serde(rename = "SUSPENDED_EV")]
    SuspendedEv,
    #[serde(rename = "SUSPENDED_EVSE")]
    SuspendedEvse,
    Idle,
}

impl ChargingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Charging => "CHARGING",
            Self::SuspendedEv => "SUSPENDED_EV",
            Self::SuspendedEvse => "SUSPENDED_EVSE",
            Self::Idle => "IDLE",
        }
    }
}

impl fmt::Display for ChargingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChargingState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CHARGING" => Ok(Self::Charging),
            "SUSPENDED_EV" => Ok(Self::SuspendedEv),
            "SUSPENDED_EVSE" => Ok(Self::SuspendedEvse),
            "IDLE" => Ok(Self::Idle),
            other => Err(format!("unknown charging state: {other}")),
        }
    }
}

/// Charging transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub transaction_id: String,
    /// Owning EVSE key, copied at start
    pub evse_id: i32,
    pub station_id: String,
    pub connector_id: i32,
    pub id_token: String,
    pub event_type: TransactionEventType,
    pub charging_state: Option<ChargingState>,
    pub start_time: DateTime<Utc>,
    pub stop_time: Option<DateTime<Utc>>,
    /// Meter reading at start (Wh)
    pub start_meter_value: Option<Decimal>,
    /// Meter reading at stop (Wh)
    pub stop_meter_value: Option<Decimal>,
    /// Energy delivered (kWh)
    pub total_energy: Option<Decimal>,
    pub stop_reason: Option<String>,
    /// Optimistic concurrency counter, bumped by the store on every update
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn start(
        transaction_id: impl Into<String>,
        evse: &Evse,
        connector_id: i32,
        id_token: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            evse_id: evse.evse_id,
            station_id: evse.station_id.clone(),
            connector_id,
            id_token: id_token.into(),
            event_type: TransactionEventType::Started,
            charging_state: Some(ChargingState::Idle),
            start_time: started_at,
            stop_time: None,
            start_meter_value: None,
            stop_meter_value: None,
            total_energy: None,
            stop_reason: None,
            version: 0,
            created_at: started_at,
            updated_at: started_at,
        }
    }

    pub fn with_start_meter(mut self, meter_start: Option<Decimal>) -> Self {
        self.start_meter_value = meter_start.map(round_meter);
        self
    }

    pub fn is_ended(&self) -> bool {
        self.stop_time.is_some()
    }

    fn ensure_open(&self, action: &str) -> DomainResult<()> {
        if self.is_ended() {
            return Err(DomainError::terminal(
                &self.transaction_id,
                format!("cannot {action}: transaction already ended"),
            ));
        }
        Ok(())
    }

    /// Returns the state that was replaced.
    pub fn update_charging_state(
        &mut self,
        new_state: ChargingState,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<ChargingState>> {
        self.ensure_open("update charging state")?;
        let previous = self.charging_state.replace(new_state);
        self.event_type = TransactionEventType::Updated;
        self.updated_at = at;
        Ok(previous)
    }

    /// Closes the transaction. `meter_stop` overrides any stop reading already held.
    pub fn stop(
        &mut self,
        at: DateTime<Utc>,
        reason: Option<&str>,
        meter_stop: Option<Decimal>,
    ) -> DomainResult<()> {
        self.ensure_open("stop")?;
        self.stop_time = Some(at);
        self.stop_reason = Some(normalize_stop_reason(reason));
        self.event_type = TransactionEventType::Ended;
        if let Some(value) = meter_stop {
            self.stop_meter_value = Some(round_meter(value));
        }
        self.updated_at = at;
        self.calculate_total_energy();
        Ok(())
    }

    /// Fills `total_energy` only when both readings are known.
    pub fn calculate_total_energy(&mut self) {
        if let (Some(start), Some(stop)) = (self.start_meter_value, self.stop_meter_value) {
            self.total_energy = Some(energy_kwh(start, stop));
        }
    }

    /// Applies a freshly recorded sample to the transaction's own readings.
    pub fn apply_meter_sample(&mut self, sample: &MeterValue) -> DomainResult<()> {
        self.ensure_open("record meter value")?;
        if sample.measurand == Measurand::EnergyActiveImportRegister
            && self.start_meter_value.is_none()
        {
            self.start_meter_value = sample.energy_wh();
        }
        self.updated_at = sample.timestamp.max(self.updated_at);
        Ok(())
    }
}

/// Wh delta to kWh, rounded half-up to three places
pub fn energy_kwh(start_wh: Decimal, stop_wh: Decimal) -> Decimal {
    ((stop_wh - start_wh) / Decimal::ONE_THOUSAND)
        .round_dp_with_strategy(METER_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

pub fn round_meter(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(METER_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

pub fn normalize_stop_reason(reason: Option<&str>) -> String {
    match reason.map(str::trim) {
        Some(r) if !r.is_empty() => r.to_string(),
        _ => DEFAULT_STOP_REASON.to_string(),
    }
}

// ── Tests ──────────────────────────────────────────────────────
