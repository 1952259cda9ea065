//! Conversion helpers between TEXT columns and domain types.
//!
//! Amounts and weights are stored as decimal strings; a stored value that no
//! longer parses is corrupted data and surfaces as a serialization error,
//! never as a silent zero.

use std::str::FromStr;

use rust_decimal::Decimal;

use fundledger_core::money::Amount;

use crate::errors::StorageError;

/// Parses a stored amount column.
pub fn parse_amount(field: &str, value: &str) -> Result<Amount, StorageError> {
    let decimal = parse_decimal(field, value)?;
    Amount::new(decimal)
        .map_err(|e| StorageError::SerializationError(format!("{field} '{value}': {e}")))
}

/// Parses a stored decimal column (e.g. a portfolio weight).
pub fn parse_decimal(field: &str, value: &str) -> Result<Decimal, StorageError> {
    Decimal::from_str(value)
        .map_err(|e| StorageError::SerializationError(format!("{field} '{value}': {e}")))
}
