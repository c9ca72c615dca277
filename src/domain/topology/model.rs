//! Station → EVSE → Connector hierarchy
//!
//! Children point at their parent by key; parents never hold their children.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// EVSE operational status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationalStatus {
    #[default]
    Operative,
    Inoperative,
}

impl OperationalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operative => "OPERATIVE",
            Self::Inoperative => "INOPERATIVE",
        }
    }
}

impl FromStr for OperationalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPERATIVE" => Ok(Self::Operative),
            "INOPERATIVE" => Ok(Self::Inoperative),
            other => Err(format!("unknown operational status: {other}")),
        }
    }
}

/// Connector status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectorStatus {
    #[default]
    Available,
    Occupied,
    Reserved,
    Unavailable,
    Faulted,
}

impl ConnectorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Occupied => "OCCUPIED",
            Self::Reserved => "RESERVED",
            Self::Unavailable => "UNAVAILABLE",
            Self::Faulted => "FAULTED",
        }
    }
}

impl fmt::Display for ConnectorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(Self::Available),
            "OCCUPIED" => Ok(Self::Occupied),
            "RESERVED" => Ok(Self::Reserved),
            "UNAVAILABLE" => Ok(Self::Unavailable),
            "FAULTED" => Ok(Self::Faulted),
            other => Err(format!("unknown connector status: {other}")),
        }
    }
}

/// Charging station (site-level smart-charging parameters)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub station_id: String,
    /// Grid capacity in kW
    pub power_grid_capacity: Decimal,
    pub max_price_limit: Decimal,
    pub algorithm_mode: i32,
    pub time_extension_factor: Decimal,
    pub max_iteration_count: i32,
    pub billing_power_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Station {
    pub fn new(station_id: impl Into<String>) -> Self {
        Self {
            station_id: station_id.into(),
            power_grid_capacity: Decimal::ZERO,
            max_price_limit: Decimal::ZERO,
            algorithm_mode: 0,
            time_extension_factor: Decimal::ONE,
            max_iteration_count: 1,
            billing_power_id: 0,
            created_at: Utc::now(),
        }
    }
}

/// Electric Vehicle Supply Equipment, unique per (evse_id, station_id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evse {
    pub evse_id: i32,
    pub station_id: String,
    /// Max power in kW
    pub max_power: Decimal,
    pub operational_status: OperationalStatus,
}

impl Evse {
    pub fn new(evse_id: i32, station_id: impl Into<String>, max_power: Decimal) -> Self {
        Self {
            evse_id,
            station_id: station_id.into(),
            max_power,
            operational_status: OperationalStatus::Operative,
        }
    }
}

/// Physical outlet on an EVSE, unique per (evse_id, station_id, connector_id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    pub connector_id: i32,
    pub evse_id: i32,
    pub station_id: String,
    pub max_power: Decimal,
    pub min_power: Decimal,
    pub status: ConnectorStatus,
}

impl Connector {
    pub fn new(evse: &Evse, connector_id: i32) -> Self {
        Self {
            connector_id,
            evse_id: evse.evse_id,
            station_id: evse.station_id.clone(),
            max_power: evse.max_power,
            min_power: Decimal::ZERO,
            status: ConnectorStatus::Available,
        }
    }
}
