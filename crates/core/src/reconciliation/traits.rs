//! Reconciliation traits.

use async_trait::async_trait;
use diesel::sqlite::SqliteConnection;

use super::model::{IntegrityCategory, IntegrityReport, IntegrityViolation, RepairSummary};
use crate::allocations::Allocation;
use crate::capital_calls::CapitalCall;
use crate::money::Amount;
use crate::payments::Payment;
use crate::Result;

/// A consistent read of the three ledger tables, handed to the checks.
///
/// The snapshot is taken outside any write lock; `repair()` re-reads the
/// affected rows inside each repair transaction before mutating.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    pub allocations: Vec<Allocation>,
    pub calls: Vec<CapitalCall>,
    pub payments: Vec<Payment>,
}

impl LedgerSnapshot {
    pub fn calls_for(&self, allocation_id: &str) -> Vec<&CapitalCall> {
        self.calls
            .iter()
            .filter(|c| c.allocation_id == allocation_id)
            .collect()
    }

    pub fn payments_for(&self, capital_call_id: &str) -> Vec<&Payment> {
        self.payments
            .iter()
            .filter(|p| p.capital_call_id == capital_call_id)
            .collect()
    }
}

/// Trait for implementing integrity checks.
///
/// Checks are pure: they analyze a snapshot and emit violations, with no
/// side effects. Repairs live in the service, not in the checks.
pub trait IntegrityCheck: Send + Sync {
    /// Unique identifier, used for logging.
    fn id(&self) -> &'static str;

    fn category(&self) -> IntegrityCategory;

    /// Analyzes the snapshot and returns any detected violations.
    fn analyze(&self, snapshot: &LedgerSnapshot) -> Vec<IntegrityViolation>;
}

/// Trait defining the storage contract for the integrity engine.
///
/// Snapshot loads go through the pool; the `*_in_transaction` repair
/// primitives are composed by the service inside per-allocation
/// transactions.
pub trait IntegrityRepositoryTrait: Send + Sync {
    fn load_snapshot(&self) -> Result<LedgerSnapshot>;

    fn calls_for_allocation_in_transaction(
        &self,
        allocation_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<CapitalCall>>;
    fn payments_for_call_in_transaction(
        &self,
        capital_call_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Payment>>;
    fn update_aggregates_in_transaction(
        &self,
        allocation_id: &str,
        called: Amount,
        funded: Amount,
        conn: &mut SqliteConnection,
    ) -> Result<()>;
    fn update_call_paid_in_transaction(
        &self,
        call_id: &str,
        paid: Amount,
        conn: &mut SqliteConnection,
    ) -> Result<()>;
    /// Re-points every call of `from` to the allocation `to`.
    fn repoint_calls_in_transaction(
        &self,
        from_allocation_id: &str,
        to_allocation_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<()>;
    fn set_committed_amount_in_transaction(
        &self,
        allocation_id: &str,
        committed: Amount,
        conn: &mut SqliteConnection,
    ) -> Result<()>;
    fn delete_allocation_in_transaction(
        &self,
        allocation_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<()>;
}

/// Trait defining the contract for the integrity service.
#[async_trait]
pub trait IntegrityServiceTrait: Send + Sync {
    /// Dry run: analyzes the ledger and returns violations without touching
    /// any row.
    async fn report(&self) -> Result<IntegrityReport>;

    /// Repairs what can be repaired deterministically, one transaction per
    /// affected allocation. Idempotent: a second run on repaired data
    /// reports zero repairable violations.
    async fn repair(&self) -> Result<RepairSummary>;
}
