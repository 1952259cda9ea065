use chrono::NaiveDate;

use super::reporting_model::{FundRollup, OverdueCall};
use crate::Result;

/// Trait defining the contract for reporting service operations.
///
/// All reads, no transactions.
pub trait ReportingServiceTrait: Send + Sync {
    /// Rollup over every allocation of `fund_id`.
    fn get_fund_rollup(&self, fund_id: &str) -> Result<FundRollup>;

    /// Every open call past its due date as of `as_of`, with allocation
    /// context attached.
    fn get_overdue_calls(&self, as_of: NaiveDate) -> Result<Vec<OverdueCall>>;
}
