use async_trait::async_trait;
use chrono::NaiveDateTime;
use diesel::sqlite::SqliteConnection;

use super::allocations_model::{Allocation, AllocationOutcome, NewAllocation};
use crate::money::Amount;
use crate::Result;

/// Trait defining the contract for allocation repository operations.
///
/// Plain methods read through the connection pool. The `*_in_transaction`
/// methods take an open write-locked connection and are composed by services
/// inside a single `DbTransactionExecutor::execute` closure, so a call
/// insert and its aggregate update always commit together.
pub trait AllocationRepositoryTrait: Send + Sync {
    fn get_by_id(&self, allocation_id: &str) -> Result<Allocation>;
    fn list(&self, fund_id_filter: Option<&str>) -> Result<Vec<Allocation>>;

    fn get_in_transaction(
        &self,
        allocation_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Allocation>;
    fn find_by_fund_and_deal_in_transaction(
        &self,
        fund_id: &str,
        deal_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Option<Allocation>>;
    fn create_in_transaction(
        &self,
        allocation: Allocation,
        conn: &mut SqliteConnection,
    ) -> Result<Allocation>;
    /// Overwrites the cached aggregates with freshly recomputed sums.
    fn update_aggregates_in_transaction(
        &self,
        allocation_id: &str,
        called: Amount,
        funded: Amount,
        conn: &mut SqliteConnection,
    ) -> Result<()>;
    fn set_committed_amount_in_transaction(
        &self,
        allocation_id: &str,
        committed: Amount,
        conn: &mut SqliteConnection,
    ) -> Result<()>;
    fn set_written_off_in_transaction(
        &self,
        allocation_id: &str,
        written_off_at: NaiveDateTime,
        conn: &mut SqliteConnection,
    ) -> Result<()>;
    /// Deletes the allocation and cascades to its calls and payments.
    fn delete_in_transaction(
        &self,
        allocation_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<()>;
}

/// Trait defining the contract for allocation service operations.
#[async_trait]
pub trait AllocationServiceTrait: Send + Sync {
    /// ALLOCATE: creates a commitment of a fund into a deal. Fails with a
    /// duplicate-allocation constraint violation when `(fundId, dealId)`
    /// already exists.
    async fn allocate(&self, new_allocation: NewAllocation) -> Result<AllocationOutcome>;

    fn get_allocation(&self, allocation_id: &str) -> Result<AllocationOutcome>;
    fn list_allocations(&self) -> Result<Vec<Allocation>>;
    fn get_allocations_by_fund(&self, fund_id: &str) -> Result<Vec<Allocation>>;

    /// Audited commitment adjustment; rejected below the called amount.
    async fn adjust_commitment(
        &self,
        allocation_id: &str,
        new_amount: Amount,
        reason: &str,
    ) -> Result<AllocationOutcome>;

    /// WRITE_OFF: terminal from any non-funded state.
    async fn write_off(&self, allocation_id: &str, reason: &str) -> Result<AllocationOutcome>;

    /// Explicit cleanup; cascades calls and payments in one transaction.
    async fn delete_allocation(&self, allocation_id: &str) -> Result<()>;
}
