//! Exact money arithmetic for the ledger.
//!
//! `Amount` wraps `rust_decimal::Decimal` and is the only numeric type the
//! ledger does money math with. Construction rejects negative values and all
//! arithmetic is checked, so neither floating-point drift nor silent overflow
//! can enter the aggregates.

use rust_decimal::Decimal;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Result, ValidationError};

/// A non-negative currency amount with exact decimal arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    /// The zero amount.
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Creates an amount from a decimal, rejecting negative values.
    pub fn new(value: Decimal) -> Result<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(ValidationError::NegativeAmount(value.to_string()).into());
        }
        Ok(Amount(value))
    }

    /// Creates an amount that must be strictly positive (call amounts,
    /// payment amounts, commitments).
    pub fn positive(value: Decimal) -> Result<Self> {
        if value.is_zero() || value.is_sign_negative() {
            return Err(ValidationError::NonPositiveAmount(value.to_string()).into());
        }
        Ok(Amount(value))
    }

    /// The underlying decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked addition; fails on decimal overflow.
    pub fn checked_add(&self, other: Amount) -> Result<Amount> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or_else(|| ValidationError::AmountOverflow.into())
    }

    /// Checked subtraction; fails if the result would be negative.
    pub fn checked_sub(&self, other: Amount) -> Result<Amount> {
        let diff = self
            .0
            .checked_sub(other.0)
            .ok_or(ValidationError::AmountOverflow)?;
        Amount::new(diff)
    }

    /// Subtraction clamped at zero, for display-only figures where a stale
    /// cache could momentarily undershoot.
    pub fn saturating_sub(&self, other: Amount) -> Amount {
        if other.0 >= self.0 {
            Amount::ZERO
        } else {
            Amount(self.0 - other.0)
        }
    }

    /// Sums an iterator of amounts with overflow checking.
    pub fn sum<I: IntoIterator<Item = Amount>>(amounts: I) -> Result<Amount> {
        let mut total = Amount::ZERO;
        for a in amounts {
            total = total.checked_add(a)?;
        }
        Ok(total)
    }

    /// Computes `pct` percent of this amount, rounded to cents
    /// (banker's rounding). Used to convert percentage call inputs to
    /// absolute currency at entry time.
    pub fn percentage(&self, pct: Decimal) -> Result<Amount> {
        if pct.is_sign_negative() {
            return Err(ValidationError::NegativeAmount(pct.to_string()).into());
        }
        let scaled = self
            .0
            .checked_mul(pct)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .ok_or(ValidationError::AmountOverflow)?;
        Amount::new(scaled.round_dp(crate::constants::AMOUNT_SCALE))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = Decimal::from_str(s).map_err(ValidationError::DecimalParse)?;
        Amount::new(value)
    }
}

// Amounts serialize as strings so JSON round-trips stay exact.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(de::Error::custom)
    }
}
