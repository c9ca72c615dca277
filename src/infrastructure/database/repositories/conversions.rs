//! Column conversion helpers shared by the SeaORM repositories

use std::str::FromStr;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::domain::transaction::model::round_meter;
use crate::domain::{DomainError, DomainResult};

/// REAL column to a three-place decimal
pub(super) fn decimal_from_db(value: f64) -> DomainResult<Decimal> {
    Decimal::from_f64(value)
        .map(round_meter)
        .ok_or_else(|| DomainError::Storage(format!("invalid decimal column value: {value}")))
}

pub(super) fn optional_decimal_from_db(value: Option<f64>) -> DomainResult<Option<Decimal>> {
    value.map(decimal_from_db).transpose()
}

pub(super) fn decimal_to_db(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

/// Parses an enum stored by name
pub(super) fn parse_column<T>(value: &str) -> DomainResult<T>
where
    T: FromStr<Err = String>,
{
    value.parse().map_err(DomainError::Storage)
}
