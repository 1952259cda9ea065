//! Integrity service implementation.
//!
//! `report()` is a read-only dry run. `repair()` merges duplicate groups
//! first, then overwrites drifted caches, one transaction per affected
//! allocation; each transaction re-reads the rows under the write lock
//! before mutating, so a repair never races a concurrent call or payment.
//! Both are idempotent: a second run on repaired data finds nothing
//! repairable.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;

use super::checks::{
    duplicate_allocations::duplicate_groups, AggregateDriftCheck, DuplicateAllocationCheck,
    OrphanedPaymentCheck,
};
use super::model::{IntegrityReport, RepairSummary};
use super::traits::{IntegrityCheck, IntegrityRepositoryTrait, IntegrityServiceTrait};
use crate::db::{with_write_retry, DbTransactionExecutor};
use crate::events::{DomainEvent, DomainEventSink};
use crate::money::Amount;
use crate::payments::net_paid;
use crate::Result;

/// Service running integrity checks and repairs over the ledger.
pub struct IntegrityService<E: DbTransactionExecutor + Send + Sync> {
    repository: Arc<dyn IntegrityRepositoryTrait>,
    event_sink: Arc<dyn DomainEventSink>,
    transaction_executor: E,
    drift_check: AggregateDriftCheck,
    duplicate_check: DuplicateAllocationCheck,
    orphan_check: OrphanedPaymentCheck,
}

impl<E: DbTransactionExecutor + Send + Sync> IntegrityService<E> {
    /// Creates a new IntegrityService instance.
    pub fn new(
        repository: Arc<dyn IntegrityRepositoryTrait>,
        event_sink: Arc<dyn DomainEventSink>,
        transaction_executor: E,
    ) -> Self {
        Self {
            repository,
            event_sink,
            transaction_executor,
            drift_check: AggregateDriftCheck::new(),
            duplicate_check: DuplicateAllocationCheck::new(),
            orphan_check: OrphanedPaymentCheck::new(),
        }
    }

    /// Merges one duplicate group into its survivor, inside one transaction.
    fn merge_group(
        &self,
        survivor_id: &str,
        duplicate_ids: &[String],
        committed_total: Amount,
    ) -> Result<()> {
        let repository = self.repository.clone();
        let survivor_id = survivor_id.to_string();
        let duplicate_ids = duplicate_ids.to_vec();

        with_write_retry("merge_duplicate_allocations", || {
            let repository = repository.clone();
            let survivor_id = survivor_id.clone();
            let duplicate_ids = duplicate_ids.clone();

            self.transaction_executor.execute(move |conn| {
                for duplicate_id in &duplicate_ids {
                    repository.repoint_calls_in_transaction(duplicate_id, &survivor_id, conn)?;
                    repository.delete_allocation_in_transaction(duplicate_id, conn)?;
                }
                repository.set_committed_amount_in_transaction(
                    &survivor_id,
                    committed_total,
                    conn,
                )?;
                // The survivor inherited new calls; refresh its caches from
                // the re-pointed rows.
                Self::recompute_in_transaction(&*repository, &survivor_id, conn)
            })
        })
    }

    /// Overwrites one allocation's caches from its rows, inside one
    /// transaction.
    fn repair_drift(&self, allocation_id: &str) -> Result<()> {
        let repository = self.repository.clone();
        let allocation_id = allocation_id.to_string();

        with_write_retry("repair_aggregate_drift", || {
            let repository = repository.clone();
            let allocation_id = allocation_id.clone();
            self.transaction_executor.execute(move |conn| {
                Self::recompute_in_transaction(&*repository, &allocation_id, conn)
            })
        })
    }

    fn recompute_in_transaction(
        repository: &dyn IntegrityRepositoryTrait,
        allocation_id: &str,
        conn: &mut diesel::sqlite::SqliteConnection,
    ) -> Result<()> {
        let calls = repository.calls_for_allocation_in_transaction(allocation_id, conn)?;
        let mut called = Amount::ZERO;
        let mut funded = Amount::ZERO;
        for call in &calls {
            called = called.checked_add(call.call_amount)?;
            let rows = repository.payments_for_call_in_transaction(&call.id, conn)?;
            let paid = net_paid(&rows)?;
            funded = funded.checked_add(paid)?;
            if paid != call.paid_amount {
                repository.update_call_paid_in_transaction(&call.id, paid, conn)?;
            }
        }
        repository.update_aggregates_in_transaction(allocation_id, called, funded, conn)
    }
}

#[async_trait]
impl<E: DbTransactionExecutor + Send + Sync> IntegrityServiceTrait for IntegrityService<E> {
    async fn report(&self) -> Result<IntegrityReport> {
        let snapshot = self.repository.load_snapshot()?;
        debug!(
            "Running integrity checks over {} allocations, {} calls, {} payments",
            snapshot.allocations.len(),
            snapshot.calls.len(),
            snapshot.payments.len()
        );

        let mut violations = Vec::new();
        for check in [
            &self.duplicate_check as &dyn IntegrityCheck,
            &self.drift_check,
            &self.orphan_check,
        ] {
            let found = check.analyze(&snapshot);
            debug!("Check {} found {} violations", check.id(), found.len());
            violations.extend(found);
        }

        for violation in &violations {
            warn!(
                "Integrity violation [{}] severity {}: {}",
                violation.category, violation.severity, violation.message
            );
        }

        Ok(IntegrityReport::new(snapshot.allocations.len(), violations))
    }

    async fn repair(&self) -> Result<RepairSummary> {
        // Merge duplicates first: the merge re-points calls, which in turn
        // moves aggregate truth, so drift repair must follow it.
        let snapshot = self.repository.load_snapshot()?;
        let mut duplicates_merged = Vec::new();
        for group in duplicate_groups(&snapshot) {
            let committed_total = Amount::sum(
                snapshot
                    .allocations
                    .iter()
                    .filter(|a| a.fund_id == group.fund_id && a.deal_id == group.deal_id)
                    .map(|a| a.committed_amount),
            )?;
            info!(
                "Merging {} duplicate allocations for fund {} / deal {} into {}",
                group.duplicate_ids.len() + 1,
                group.fund_id,
                group.deal_id,
                group.survivor_id
            );
            self.merge_group(&group.survivor_id, &group.duplicate_ids, committed_total)?;
            duplicates_merged.push(group.survivor_id);
        }

        // Re-read after the merges, then repair drift per allocation.
        let snapshot = self.repository.load_snapshot()?;
        let mut drift_repaired = Vec::new();
        for violation in self.drift_check.analyze(&snapshot) {
            if let Some(allocation_id) = violation.allocation_id {
                info!("Repairing aggregate drift on allocation {}", allocation_id);
                self.repair_drift(&allocation_id)?;
                drift_repaired.push(allocation_id);
            }
        }

        // Orphans are report-only.
        let snapshot = self.repository.load_snapshot()?;
        let remaining = self.orphan_check.analyze(&snapshot);

        let summary = RepairSummary {
            drift_repaired,
            duplicates_merged,
            remaining,
        };
        if summary.repair_count() > 0 {
            let mut repaired: Vec<String> = summary
                .drift_repaired
                .iter()
                .chain(summary.duplicates_merged.iter())
                .cloned()
                .collect();
            repaired.dedup();
            self.event_sink.emit(DomainEvent::integrity_repaired(
                repaired,
                summary.repair_count(),
            ));
        }
        Ok(summary)
    }
}
