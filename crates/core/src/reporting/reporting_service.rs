use chrono::NaiveDate;
use log::debug;
use std::sync::Arc;

use super::reporting_model::{FundRollup, OverdueCall};
use super::reporting_traits::ReportingServiceTrait;
use crate::allocations::AllocationRepositoryTrait;
use crate::capital_calls::CapitalCallRepositoryTrait;
use crate::Result;

/// Read-only reporting façade over the allocation and call repositories.
pub struct ReportingService {
    allocation_repository: Arc<dyn AllocationRepositoryTrait>,
    call_repository: Arc<dyn CapitalCallRepositoryTrait>,
}

impl ReportingService {
    /// Creates a new ReportingService instance.
    pub fn new(
        allocation_repository: Arc<dyn AllocationRepositoryTrait>,
        call_repository: Arc<dyn CapitalCallRepositoryTrait>,
    ) -> Self {
        Self {
            allocation_repository,
            call_repository,
        }
    }
}

impl ReportingServiceTrait for ReportingService {
    fn get_fund_rollup(&self, fund_id: &str) -> Result<FundRollup> {
        let allocations = self.allocation_repository.list(Some(fund_id))?;
        debug!(
            "Computing rollup for fund {} over {} allocations",
            fund_id,
            allocations.len()
        );
        FundRollup::from_allocations(fund_id, &allocations)
    }

    fn get_overdue_calls(&self, as_of: NaiveDate) -> Result<Vec<OverdueCall>> {
        let calls = self.call_repository.list_overdue(as_of)?;
        let mut overdue = Vec::with_capacity(calls.len());
        for call in &calls {
            let allocation = self.allocation_repository.get_by_id(&call.allocation_id)?;
            overdue.push(OverdueCall::from_call(call, &allocation, as_of));
        }
        // Most overdue first.
        overdue.sort_by(|a, b| b.days_overdue.cmp(&a.days_overdue));
        Ok(overdue)
    }
}
