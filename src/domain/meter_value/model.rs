//! Metering samples attached to a transaction

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::transaction::model::round_meter;

/// Physical quantity a sample represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Measurand {
    PowerActiveImport,
    PowerActiveExport,
    EnergyActiveImportRegister,
    EnergyActiveExportRegister,
    PowerReactiveImport,
    CurrentImport,
    CurrentExport,
    Voltage,
    Frequency,
    Temperature,
    Soc,
    Rpm,
}

impl Measurand {
    pub const ALL: [Measurand; 12] = [
        Self::PowerActiveImport,
        Self::PowerActiveExport,
        Self::EnergyActiveImportRegister,
        Self::EnergyActiveExportRegister,
        Self::PowerReactiveImport,
        Self::CurrentImport,
        Self::CurrentExport,
        Self::Voltage,
        Self::Frequency,
        Self::Temperature,
        Self::Soc,
        Self::Rpm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PowerActiveImport => "POWER_ACTIVE_IMPORT",
            Self::PowerActiveExport => "POWER_ACTIVE_EXPORT",
            Self::EnergyActiveImportRegister => "ENERGY_ACTIVE_IMPORT_REGISTER",
            Self::EnergyActiveExportRegister => "ENERGY_ACTIVE_EXPORT_REGISTER",
            Self::PowerReactiveImport => "POWER_REACTIVE_IMPORT",
            Self::CurrentImport => "CURRENT_IMPORT",
            Self::CurrentExport => "CURRENT_EXPORT",
            Self::Voltage => "VOLTAGE",
            Self::Frequency => "FREQUENCY",
            Self::Temperature => "TEMPERATURE",
            Self::Soc => "SOC",
            Self::Rpm => "RPM",
        }
    }

    pub fn is_energy_register(&self) -> bool {
        matches!(
            self,
            Self::EnergyActiveImportRegister | Self::EnergyActiveExportRegister
        )
    }
}

impl fmt::Display for Measurand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Measurand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown measurand: {s}"))
    }
}

/// A single metering sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterValue {
    /// Store-assigned surrogate id; `None` until persisted
    pub id: Option<i64>,
    pub transaction_id: String,
    pub timestamp: DateTime<Utc>,
    pub measurand: Measurand,
    pub value: Decimal,
    pub unit: Option<String>,
    pub phase: Option<String>,
    pub location: Option<String>,
}

impl MeterValue {
    pub fn new(
        transaction_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        measurand: Measurand,
        value: Decimal,
    ) -> Self {
        Self {
            id: None,
            transaction_id: transaction_id.into(),
            timestamp,
            measurand,
            value: round_meter(value),
            unit: None,
            phase: None,
            location: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    /// Register reading normalized to Wh. `None` for non-energy measurands
    /// or units other than Wh/kWh.
    pub fn energy_wh(&self) -> Option<Decimal> {
        if !self.measurand.is_energy_register() {
            return None;
        }
        match self.unit.as_deref() {
            None => Some(self.value),
            Some(u) if u.eq_ignore_ascii_case("wh") => Some(self.value),
            Some(u) if u.eq_ignore_ascii_case("kwh") => {
                Some(round_meter(self.value * Decimal::ONE_THOUSAND))
            }
            Some(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn values_keep_three_decimals() {
        let mv = MeterValue::new("TXN-1", Utc::now(), Measurand::Voltage, d("229.98765"));
        assert_eq!(mv.value.to_string(), "229.988");
    }

    #[test]
    fn energy_normalizes_units() {
        let wh = MeterValue::new("TXN-1", Utc::now(), Measurand::EnergyActiveImportRegister, d("1500"))
            .with_unit("Wh");
        let kwh = MeterValue::new("TXN-1", Utc::now(), Measurand::EnergyActiveImportRegister, d("1.5"))
            .with_unit("kWh");
        let bare = MeterValue::new("TXN-1", Utc::now(), Measurand::EnergyActiveImportRegister, d("1500"));
        assert_eq!(wh.energy_wh(), Some(d("1500")));
        assert_eq!(kwh.energy_wh(), Some(d("1500")));
        assert_eq!(bare.energy_wh(), Some(d("1500")));
    }

    #[test]
    fn non_energy_samples_have_no_energy() {
        let power = MeterValue::new("TXN-1", Utc::now(), Measurand::PowerActiveImport, d("7.4"))
            .with_unit("kW");
        assert_eq!(power.energy_wh(), None);
        let odd = MeterValue::new("TXN-1", Utc::now(), Measurand::EnergyActiveImportRegister, d("3"))
            .with_unit("varh");
        assert_eq!(odd.energy_wh(), None);
    }

    #[test]
    fn measurand_names_round_trip() {
        for m in Measurand::ALL {
            assert_eq!(m.as_str().parse::<Measurand>(), Ok(m));
            assert_eq!(serde_json::to_value(m).unwrap(), serde_json::json!(m.as_str()));
        }
    }
}
