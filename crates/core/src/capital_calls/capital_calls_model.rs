//! Capital call domain models.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::allocations::Allocation;
use crate::errors::{Result, ValidationError};
use crate::lifecycle::{
    call_status_for, AllocationStatus, CallSnapshot, CapitalCallStatus, LifecycleEventKind,
};
use crate::money::Amount;

/// Domain model representing a capital call against an allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapitalCall {
    pub id: String,
    /// Immutable owner reference.
    pub allocation_id: String,
    pub call_amount: Amount,
    /// Derived from this call's payments; maintained in the same
    /// transaction as every payment insert.
    pub paid_amount: Amount,
    /// Issue date of the call.
    pub call_date: NaiveDate,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    /// Client-supplied key; a retry with the same key returns the original
    /// call instead of double-applying.
    pub idempotency_key: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl CapitalCall {
    /// Derived status as of `as_of`; never stored.
    pub fn status_as_of(&self, as_of: NaiveDate) -> CapitalCallStatus {
        call_status_for(
            self.call_amount,
            self.paid_amount,
            self.call_date,
            self.due_date,
            as_of,
        )
    }

    /// Unpaid remainder of the call.
    pub fn outstanding(&self) -> Amount {
        self.call_amount.saturating_sub(self.paid_amount)
    }

    pub fn is_open(&self) -> bool {
        self.paid_amount < self.call_amount
    }

    /// Snapshot for the state machine.
    pub fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            call_id: self.id.clone(),
            allocation_id: self.allocation_id.clone(),
            call_amount: self.call_amount,
            paid_amount: self.paid_amount,
        }
    }
}

/// Call amount as supplied by the caller.
///
/// Canonical storage is always absolute currency; a percentage is a pure
/// input convenience converted against the allocation's committed amount at
/// entry time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallAmountInput {
    Absolute(Amount),
    Percentage(Decimal),
}

impl CallAmountInput {
    /// Resolves the input to an absolute amount against `committed`.
    pub fn resolve(&self, committed: Amount) -> Result<Amount> {
        match self {
            CallAmountInput::Absolute(amount) => {
                if amount.is_zero() {
                    return Err(
                        ValidationError::NonPositiveAmount(amount.to_string()).into()
                    );
                }
                Ok(*amount)
            }
            CallAmountInput::Percentage(pct) => {
                if pct.is_sign_negative() || pct.is_zero() || *pct > Decimal::ONE_HUNDRED {
                    return Err(ValidationError::InvalidInput(format!(
                        "call percentage must be in (0, 100], got {pct}"
                    ))
                    .into());
                }
                let amount = committed.percentage(*pct)?;
                if amount.is_zero() {
                    return Err(ValidationError::NonPositiveAmount(amount.to_string()).into());
                }
                Ok(amount)
            }
        }
    }
}

/// Input model for creating a capital call (the CREATE_CALL operation).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCapitalCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub allocation_id: String,
    pub amount: CallAmountInput,
    /// Issue date; defaults to today.
    pub call_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub idempotency_key: Option<String>,
}

impl NewCapitalCall {
    /// Validates the input before any lock is taken.
    pub fn validate(&self) -> Result<()> {
        if self.allocation_id.trim().is_empty() {
            return Err(ValidationError::MissingField("allocationId".to_string()).into());
        }
        let call_date = self.call_date.unwrap_or_else(today);
        if self.due_date < call_date {
            return Err(ValidationError::InvalidInput(format!(
                "due date {} precedes call date {}",
                self.due_date, call_date
            ))
            .into());
        }
        Ok(())
    }

    /// Materializes the call row once the amount has been resolved and
    /// validated against the allocation.
    pub fn into_call(self, call_amount: Amount) -> CapitalCall {
        let now = Utc::now().naive_utc();
        CapitalCall {
            id: self.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            allocation_id: self.allocation_id,
            call_amount,
            paid_amount: Amount::ZERO,
            call_date: self.call_date.unwrap_or_else(today),
            due_date: self.due_date,
            notes: self.notes,
            idempotency_key: self.idempotency_key,
            created_at: now,
            updated_at: now,
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Result of a successful CREATE_CALL: the call, the refreshed allocation,
/// and the state-machine outputs callers need to guard their UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOutcome {
    pub call: CapitalCall,
    pub allocation: Allocation,
    pub status: AllocationStatus,
    pub valid_next_events: Vec<LifecycleEventKind>,
    /// True when an idempotency-keyed retry returned the original record.
    pub idempotent_replay: bool,
}

impl CallOutcome {
    pub fn new(call: CapitalCall, allocation: Allocation, idempotent_replay: bool) -> Self {
        let status = allocation.status();
        let valid_next_events = allocation.valid_events();
        Self {
            call,
            allocation,
            status,
            valid_next_events,
            idempotent_replay,
        }
    }
}
