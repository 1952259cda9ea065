//! Allocation domain models.

use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ValidationError};
use crate::lifecycle::{
    self, AllocationSnapshot, AllocationStatus, LifecycleEventKind,
};
use crate::money::Amount;

/// Domain model representing one fund's commitment to one deal.
///
/// `called_amount` and `funded_amount` are derived caches: they always equal
/// the sums over the allocation's capital calls and payments, recomputed in
/// the same transaction as every causing insert. The calls/payments tables
/// remain the source of truth; the reconciliation engine repairs any drift
/// toward them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub id: String,
    pub fund_id: String,
    pub deal_id: String,
    pub committed_amount: Amount,
    pub called_amount: Amount,
    pub funded_amount: Amount,
    /// Security label from the originating commitment (e.g. "EQUITY",
    /// "CONVERTIBLE_NOTE"). Informational.
    pub security_type: Option<String>,
    /// Target weight of this deal in the fund, percent in [0, 100].
    pub portfolio_weight: Option<Decimal>,
    pub notes: Option<String>,
    /// Set by the WRITE_OFF event; terminal.
    pub written_off_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Allocation {
    /// Derived lifecycle status; never stored, never set by callers.
    pub fn status(&self) -> AllocationStatus {
        self.snapshot().status()
    }

    /// Snapshot of the amounts for the state machine.
    pub fn snapshot(&self) -> AllocationSnapshot {
        AllocationSnapshot {
            allocation_id: self.id.clone(),
            committed: self.committed_amount,
            called: self.called_amount,
            funded: self.funded_amount,
            written_off: self.written_off_at.is_some(),
        }
    }

    /// Commitment not yet called.
    pub fn uncalled(&self) -> Amount {
        self.committed_amount.saturating_sub(self.called_amount)
    }

    /// Called but not yet funded.
    pub fn outstanding(&self) -> Amount {
        self.called_amount.saturating_sub(self.funded_amount)
    }

    /// Events currently valid for this allocation.
    pub fn valid_events(&self) -> Vec<LifecycleEventKind> {
        lifecycle::valid_events(&self.snapshot())
    }
}

/// Input model for creating a new allocation (the ALLOCATE operation).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAllocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub fund_id: String,
    pub deal_id: String,
    pub committed_amount: Amount,
    pub security_type: Option<String>,
    pub portfolio_weight: Option<Decimal>,
    pub notes: Option<String>,
}

impl NewAllocation {
    /// Validates the input before any lock is taken.
    pub fn validate(&self) -> Result<()> {
        if self.fund_id.trim().is_empty() {
            return Err(ValidationError::MissingField("fundId".to_string()).into());
        }
        if self.deal_id.trim().is_empty() {
            return Err(ValidationError::MissingField("dealId".to_string()).into());
        }
        if self.committed_amount.is_zero() {
            return Err(ValidationError::NonPositiveAmount(
                self.committed_amount.to_string(),
            )
            .into());
        }
        validate_portfolio_weight(self.portfolio_weight)?;
        Ok(())
    }

    /// Materializes the allocation with a fresh id and zero aggregates.
    pub fn into_allocation(self) -> Allocation {
        let now = Utc::now().naive_utc();
        Allocation {
            id: self
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            fund_id: self.fund_id,
            deal_id: self.deal_id,
            committed_amount: self.committed_amount,
            called_amount: Amount::ZERO,
            funded_amount: Amount::ZERO,
            security_type: self.security_type,
            portfolio_weight: self.portfolio_weight,
            notes: self.notes,
            written_off_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Checks a portfolio weight is inside [0, 100] when present.
pub fn validate_portfolio_weight(weight: Option<Decimal>) -> Result<()> {
    if let Some(w) = weight {
        if w.is_sign_negative() || w > Decimal::from(crate::constants::MAX_PORTFOLIO_WEIGHT) {
            return Err(ValidationError::PortfolioWeightOutOfRange(w.to_string()).into());
        }
    }
    Ok(())
}

/// Result of a mutating allocation operation: the record plus the derived
/// status and the set of valid next events, so callers can guard UI state
/// without re-deriving the state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationOutcome {
    pub allocation: Allocation,
    pub status: AllocationStatus,
    pub valid_next_events: Vec<LifecycleEventKind>,
}

impl From<Allocation> for AllocationOutcome {
    fn from(allocation: Allocation) -> Self {
        let status = allocation.status();
        let valid_next_events = allocation.valid_events();
        Self {
            allocation,
            status,
            valid_next_events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn new_allocation() -> NewAllocation {
        NewAllocation {
            id: None,
            fund_id: "fund-1".to_string(),
            deal_id: "deal-1".to_string(),
            committed_amount: Amount::new(dec!(1000000)).unwrap(),
            security_type: Some("EQUITY".to_string()),
            portfolio_weight: Some(dec!(12.5)),
            notes: None,
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_input() {
        assert!(new_allocation().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_ids() {
        let mut input = new_allocation();
        input.fund_id = "  ".to_string();
        assert!(input.validate().is_err());

        let mut input = new_allocation();
        input.deal_id = String::new();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_commitment() {
        let mut input = new_allocation();
        input.committed_amount = Amount::ZERO;
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_weight_out_of_range() {
        let mut input = new_allocation();
        input.portfolio_weight = Some(dec!(100.01));
        assert!(input.validate().is_err());

        let mut input = new_allocation();
        input.portfolio_weight = Some(dec!(-1));
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_new_allocation_starts_committed() {
        let allocation = new_allocation().into_allocation();
        assert_eq!(allocation.status(), AllocationStatus::Committed);
        assert!(allocation.called_amount.is_zero());
        assert!(allocation.funded_amount.is_zero());
        assert_eq!(allocation.uncalled(), allocation.committed_amount);
    }

    #[test]
    fn test_outcome_carries_valid_events() {
        let outcome = AllocationOutcome::from(new_allocation().into_allocation());
        assert_eq!(outcome.status, AllocationStatus::Committed);
        assert!(outcome
            .valid_next_events
            .contains(&LifecycleEventKind::CreateCall));
    }
}
