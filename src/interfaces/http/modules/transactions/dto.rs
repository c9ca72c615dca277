//! Transaction DTOs

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::transactions::{NewMeterValue, StartTransaction, StopTransaction};
use crate::domain::meter_value::{Measurand, MeterValue};
use crate::domain::transaction::model::round_meter;
use crate::domain::transaction::{ChargingState, Transaction, TransactionEventType};
use crate::domain::DomainError;

/// Meter readings arrive as JSON numbers and are kept to three places
fn meter_decimal(field: &str, value: f64) -> Result<Decimal, DomainError> {
    Decimal::from_f64(value)
        .map(round_meter)
        .ok_or_else(|| DomainError::DomainViolation(format!("{field} is not a finite number")))
}

fn optional_meter_decimal(field: &str, value: Option<f64>) -> Result<Option<Decimal>, DomainError> {
    value.map(|v| meter_decimal(field, v)).transpose()
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartTransactionRequest {
    #[validate(range(min = 1, message = "must be positive"))]
    pub evse_id: i32,
    #[validate(length(min = 1, max = 64, message = "is required"))]
    pub station_id: String,
    #[validate(range(min = 1, message = "must be positive"))]
    pub connector_id: i32,
    #[validate(length(min = 1, max = 255, message = "is required"))]
    pub id_token: String,
    /// Wh
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub meter_start: Option<f64>,
}

impl StartTransactionRequest {
    pub fn into_command(self) -> Result<StartTransaction, DomainError> {
        Ok(StartTransaction {
            meter_start: optional_meter_decimal("meterStart", self.meter_start)?,
            evse_id: self.evse_id,
            station_id: self.station_id,
            connector_id: self.connector_id,
            id_token: self.id_token,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StopTransactionRequest {
    #[validate(length(max = 255, message = "is too long"))]
    pub stop_reason: Option<String>,
    /// Wh
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub meter_stop: Option<f64>,
}

impl StopTransactionRequest {
    pub fn into_command(self) -> Result<StopTransaction, DomainError> {
        Ok(StopTransaction {
            meter_stop: optional_meter_decimal("meterStop", self.meter_stop)?,
            stop_reason: self.stop_reason,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChargingStateRequest {
    pub charging_state: ChargingState,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeterValueRequest {
    pub timestamp: Option<DateTime<Utc>>,
    pub measurand: Measurand,
    pub value: f64,
    #[validate(length(min = 1, max = 16, message = "must be 1-16 characters"))]
    pub unit: Option<String>,
    #[validate(length(min = 1, max = 16, message = "must be 1-16 characters"))]
    pub phase: Option<String>,
    #[validate(length(min = 1, max = 32, message = "must be 1-32 characters"))]
    pub location: Option<String>,
}

impl RecordMeterValueRequest {
    pub fn into_sample(self) -> Result<NewMeterValue, DomainError> {
        Ok(NewMeterValue {
            value: meter_decimal("value", self.value)?,
            timestamp: self.timestamp,
            measurand: self.measurand,
            unit: self.unit,
            phase: self.phase,
            location: self.location,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTransactionsQuery {
    pub station_id: String,
}

/// Transaction as returned by the API
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub transaction_id: String,
    pub evse_id: i32,
    pub station_id: String,
    pub connector_id: i32,
    pub id_token: String,
    pub event_type: TransactionEventType,
    pub charging_state: Option<ChargingState>,
    pub start_time: DateTime<Utc>,
    pub stop_time: Option<DateTime<Utc>>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub start_meter_value: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub stop_meter_value: Option<Decimal>,
    /// kWh
    #[serde(with = "rust_decimal::serde::float_option")]
    pub total_energy: Option<Decimal>,
    pub stop_reason: Option<String>,
    pub version: i32,
}

impl TransactionDto {
    pub fn from_domain(tx: Transaction) -> Self {
        Self {
            transaction_id: tx.transaction_id,
            evse_id: tx.evse_id,
            station_id: tx.station_id,
            connector_id: tx.connector_id,
            id_token: tx.id_token,
            event_type: tx.event_type,
            charging_state: tx.charging_state,
            start_time: tx.start_time,
            stop_time: tx.stop_time,
            start_meter_value: tx.start_meter_value,
            stop_meter_value: tx.stop_meter_value,
            total_energy: tx.total_energy,
            stop_reason: tx.stop_reason,
            version: tx.version,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterValueDto {
    pub id: Option<i64>,
    pub transaction_id: String,
    pub timestamp: DateTime<Utc>,
    pub measurand: Measurand,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl MeterValueDto {
    pub fn from_domain(value: MeterValue) -> Self {
        Self {
            id: value.id,
            transaction_id: value.transaction_id,
            timestamp: value.timestamp,
            measurand: value.measurand,
            value: value.value,
            unit: value.unit,
            phase: value.phase,
            location: value.location,
        }
    }
}
