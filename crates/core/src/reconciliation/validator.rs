//! Pure row-level invariant predicates.
//!
//! Shared by the drift check and by tests; the write-path services enforce
//! the same rules through the lifecycle state machine before committing, so
//! any fault found here is broken existing data, not a caller error.

use rust_decimal::Decimal;

use crate::allocations::Allocation;
use crate::capital_calls::CapitalCall;
use crate::constants::MAX_PORTFOLIO_WEIGHT;

/// A single broken invariant on one stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowFault {
    CalledExceedsCommitted,
    FundedExceedsCalled,
    PaidExceedsCall { call_id: String },
    PortfolioWeightOutOfRange,
}

impl std::fmt::Display for RowFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowFault::CalledExceedsCommitted => write!(f, "called amount exceeds committed"),
            RowFault::FundedExceedsCalled => write!(f, "funded amount exceeds called"),
            RowFault::PaidExceedsCall { call_id } => {
                write!(f, "paid amount exceeds call amount on call {call_id}")
            }
            RowFault::PortfolioWeightOutOfRange => {
                write!(f, "portfolio weight outside [0, 100]")
            }
        }
    }
}

/// True when the weight is absent or inside [0, 100].
pub fn portfolio_weight_in_range(weight: Option<Decimal>) -> bool {
    weight.map_or(true, |w| {
        !w.is_sign_negative() && w <= Decimal::from(MAX_PORTFOLIO_WEIGHT)
    })
}

/// Checks the stored amounts of one allocation and its calls.
///
/// `Amount` construction already excludes negatives, so only the ordering
/// invariants and the weight range remain checkable here.
pub fn allocation_row_faults(allocation: &Allocation, calls: &[&CapitalCall]) -> Vec<RowFault> {
    let mut faults = Vec::new();
    if allocation.called_amount > allocation.committed_amount {
        faults.push(RowFault::CalledExceedsCommitted);
    }
    if allocation.funded_amount > allocation.called_amount {
        faults.push(RowFault::FundedExceedsCalled);
    }
    if !portfolio_weight_in_range(allocation.portfolio_weight) {
        faults.push(RowFault::PortfolioWeightOutOfRange);
    }
    for call in calls {
        if call.paid_amount > call.call_amount {
            faults.push(RowFault::PaidExceedsCall {
                call_id: call.id.clone(),
            });
        }
    }
    faults
}
