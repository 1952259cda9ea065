//! Payment domain models.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::allocations::Allocation;
use crate::capital_calls::CapitalCall;
use crate::errors::{Error, Result, ValidationError};
use crate::lifecycle::{AllocationStatus, LifecycleEventKind};
use crate::money::Amount;

/// Whether a record settles a call or offsets an earlier payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentKind {
    #[default]
    Payment,
    Reversal,
}

/// Domain model representing a recorded transfer against one capital call.
///
/// The stored amount is always positive; reversals are subtracted when
/// aggregating. Rows are never edited in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    /// Immutable, required - a payment may never exist without a call.
    pub capital_call_id: String,
    pub amount: Amount,
    pub payment_date: NaiveDate,
    pub kind: PaymentKind,
    /// Back-reference to the corrected payment; set only on reversals.
    pub reverses_payment_id: Option<String>,
    /// External transaction reference (wire id, cheque number).
    pub tx_ref: Option<String>,
    pub idempotency_key: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Payment {
    /// The record's contribution to the call's paid amount.
    pub fn signed_value(&self) -> Decimal {
        match self.kind {
            PaymentKind::Payment => self.amount.value(),
            PaymentKind::Reversal => -self.amount.value(),
        }
    }
}

/// Nets a call's payment records into its paid amount.
///
/// A negative net means reversal rows exceed payment rows - broken existing
/// data, surfaced as an integrity fault rather than a caller error.
pub fn net_paid(payments: &[Payment]) -> Result<Amount> {
    let mut net = Decimal::ZERO;
    for p in payments {
        net = net
            .checked_add(p.signed_value())
            .ok_or(ValidationError::AmountOverflow)?;
    }
    if net.is_sign_negative() && !net.is_zero() {
        return Err(Error::IntegrityFault(format!(
            "reversals exceed payments by {}",
            -net
        )));
    }
    Amount::new(net)
}

/// Remaining unreversed value of one payment, given all records of its call.
pub fn unreversed_remainder(original: &Payment, payments: &[Payment]) -> Result<Amount> {
    let reversed = Amount::sum(
        payments
            .iter()
            .filter(|p| {
                p.kind == PaymentKind::Reversal
                    && p.reverses_payment_id.as_deref() == Some(original.id.as_str())
            })
            .map(|p| p.amount),
    )?;
    original.amount.checked_sub(reversed).map_err(|_| {
        Error::IntegrityFault(format!(
            "payment {} is over-reversed: {} reversed of {}",
            original.id, reversed, original.amount
        ))
    })
}

/// Input model for recording a payment (the PAYMENT_RECEIVED operation).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub capital_call_id: String,
    pub amount: Amount,
    /// Defaults to today.
    pub payment_date: Option<NaiveDate>,
    pub tx_ref: Option<String>,
    pub idempotency_key: Option<String>,
}

impl NewPayment {
    /// Validates the input before any lock is taken.
    pub fn validate(&self) -> Result<()> {
        if self.capital_call_id.trim().is_empty() {
            return Err(ValidationError::MissingField("capitalCallId".to_string()).into());
        }
        if self.amount.is_zero() {
            return Err(ValidationError::NonPositiveAmount(self.amount.to_string()).into());
        }
        Ok(())
    }

    pub fn into_payment(self) -> Payment {
        Payment {
            id: self.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            capital_call_id: self.capital_call_id,
            amount: self.amount,
            payment_date: self.payment_date.unwrap_or_else(|| Utc::now().date_naive()),
            kind: PaymentKind::Payment,
            reverses_payment_id: None,
            tx_ref: self.tx_ref,
            idempotency_key: self.idempotency_key,
            created_at: Utc::now().naive_utc(),
        }
    }
}

/// Result of a successful payment or reversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutcome {
    pub payment: Payment,
    pub call: CapitalCall,
    pub allocation: Allocation,
    pub status: AllocationStatus,
    pub valid_next_events: Vec<LifecycleEventKind>,
    pub idempotent_replay: bool,
}

impl PaymentOutcome {
    pub fn new(
        payment: Payment,
        call: CapitalCall,
        allocation: Allocation,
        idempotent_replay: bool,
    ) -> Self {
        let status = allocation.status();
        let valid_next_events = allocation.valid_events();
        Self {
            payment,
            call,
            allocation,
            status,
            valid_next_events,
            idempotent_replay,
        }
    }
}
