use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::sqlite::SqliteConnection;

use super::capital_calls_model::{CallOutcome, CapitalCall, NewCapitalCall};
use crate::money::Amount;
use crate::Result;

/// Trait defining the contract for capital call repository operations.
pub trait CapitalCallRepositoryTrait: Send + Sync {
    fn get_by_id(&self, call_id: &str) -> Result<CapitalCall>;
    fn list_for_allocation(&self, allocation_id: &str) -> Result<Vec<CapitalCall>>;
    /// Calls past their due date and not fully paid as of `as_of`.
    fn list_overdue(&self, as_of: NaiveDate) -> Result<Vec<CapitalCall>>;

    fn get_in_transaction(
        &self,
        call_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<CapitalCall>;
    fn list_for_allocation_in_transaction(
        &self,
        allocation_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<CapitalCall>>;
    fn find_by_idempotency_key_in_transaction(
        &self,
        key: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Option<CapitalCall>>;
    fn create_in_transaction(
        &self,
        call: CapitalCall,
        conn: &mut SqliteConnection,
    ) -> Result<CapitalCall>;
    fn update_paid_amount_in_transaction(
        &self,
        call_id: &str,
        paid: Amount,
        conn: &mut SqliteConnection,
    ) -> Result<()>;
}

/// Trait defining the contract for capital call service operations.
#[async_trait]
pub trait CapitalCallServiceTrait: Send + Sync {
    /// CREATE_CALL: issues a call against an allocation, atomically with the
    /// aggregate update. Fails when the sum of calls would exceed the
    /// commitment.
    async fn create_call(&self, new_call: NewCapitalCall) -> Result<CallOutcome>;

    fn get_call(&self, call_id: &str) -> Result<CapitalCall>;
    fn get_calls_for_allocation(&self, allocation_id: &str) -> Result<Vec<CapitalCall>>;
    /// Open calls past their due date as of `as_of`.
    fn get_overdue_calls(&self, as_of: NaiveDate) -> Result<Vec<CapitalCall>>;
}
