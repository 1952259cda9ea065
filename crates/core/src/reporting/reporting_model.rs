//! Reporting domain models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::allocations::Allocation;
use crate::capital_calls::CapitalCall;
use crate::lifecycle::CapitalCallStatus;
use crate::money::Amount;
use crate::Result;

/// Aggregate view over every allocation of one fund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundRollup {
    pub fund_id: String,
    pub allocation_count: usize,
    pub total_committed: Amount,
    pub total_called: Amount,
    pub total_funded: Amount,
    /// Commitment not yet called: `total_committed - total_called`.
    pub uncalled: Amount,
    /// Called but not yet funded: `total_called - total_funded`.
    pub outstanding: Amount,
}

impl FundRollup {
    /// Sums the rollup over the fund's allocations.
    ///
    /// Written-off allocations keep contributing their historical figures;
    /// the rollup reports what actually moved, not what remains callable.
    pub fn from_allocations(fund_id: &str, allocations: &[Allocation]) -> Result<Self> {
        let total_committed = Amount::sum(allocations.iter().map(|a| a.committed_amount))?;
        let total_called = Amount::sum(allocations.iter().map(|a| a.called_amount))?;
        let total_funded = Amount::sum(allocations.iter().map(|a| a.funded_amount))?;
        Ok(Self {
            fund_id: fund_id.to_string(),
            allocation_count: allocations.len(),
            total_committed,
            total_called,
            total_funded,
            uncalled: total_committed.saturating_sub(total_called),
            outstanding: total_called.saturating_sub(total_funded),
        })
    }
}

/// One overdue capital call with the context a chaser needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueCall {
    pub call_id: String,
    pub allocation_id: String,
    pub fund_id: String,
    pub deal_id: String,
    pub call_amount: Amount,
    pub paid_amount: Amount,
    pub outstanding: Amount,
    pub due_date: NaiveDate,
    pub days_overdue: i64,
    pub status: CapitalCallStatus,
}

impl OverdueCall {
    pub fn from_call(call: &CapitalCall, allocation: &Allocation, as_of: NaiveDate) -> Self {
        Self {
            call_id: call.id.clone(),
            allocation_id: call.allocation_id.clone(),
            fund_id: allocation.fund_id.clone(),
            deal_id: allocation.deal_id.clone(),
            call_amount: call.call_amount,
            paid_amount: call.paid_amount,
            outstanding: call.outstanding(),
            due_date: call.due_date,
            days_overdue: (as_of - call.due_date).num_days(),
            status: call.status_as_of(as_of),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn allocation(id: &str, committed: &str, called: &str, funded: &str) -> Allocation {
        let now = Utc::now().naive_utc();
        Allocation {
            id: id.to_string(),
            fund_id: "fund-1".to_string(),
            deal_id: format!("deal-{id}"),
            committed_amount: committed.parse().unwrap(),
            called_amount: called.parse().unwrap(),
            funded_amount: funded.parse().unwrap(),
            security_type: None,
            portfolio_weight: None,
            notes: None,
            written_off_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_rollup_sums_over_allocations() {
        let allocations = vec![
            allocation("a1", "1000000", "400000", "150000"),
            allocation("a2", "500000", "500000", "500000"),
        ];
        let rollup = FundRollup::from_allocations("fund-1", &allocations).unwrap();
        assert_eq!(rollup.allocation_count, 2);
        assert_eq!(rollup.total_committed, Amount::new(dec!(1500000)).unwrap());
        assert_eq!(rollup.total_called, Amount::new(dec!(900000)).unwrap());
        assert_eq!(rollup.total_funded, Amount::new(dec!(650000)).unwrap());
        assert_eq!(rollup.uncalled, Amount::new(dec!(600000)).unwrap());
        assert_eq!(rollup.outstanding, Amount::new(dec!(250000)).unwrap());
    }

    #[test]
    fn test_rollup_over_empty_fund() {
        let rollup = FundRollup::from_allocations("fund-9", &[]).unwrap();
        assert_eq!(rollup.allocation_count, 0);
        assert!(rollup.total_committed.is_zero());
        assert!(rollup.uncalled.is_zero());
    }
}
