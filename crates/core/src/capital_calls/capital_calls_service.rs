use log::{debug, warn};
use std::sync::Arc;

use super::capital_calls_model::{CallOutcome, CapitalCall, NewCapitalCall};
use super::capital_calls_traits::{CapitalCallRepositoryTrait, CapitalCallServiceTrait};
use crate::allocations::AllocationRepositoryTrait;
use crate::db::{with_write_retry, DbTransactionExecutor};
use crate::events::{DomainEvent, DomainEventSink};
use crate::lifecycle::{self, AllocationSnapshot};
use crate::money::Amount;
use crate::{Error, Result};

/// Service for issuing capital calls.
///
/// Every call is created inside one write-locked transaction that reads the
/// current call rows, validates the event through the state machine, inserts
/// the call, and overwrites the allocation's cached aggregates - so a
/// concurrent call or payment can never interleave into an over-commitment.
pub struct CapitalCallService<E: DbTransactionExecutor + Send + Sync> {
    call_repository: Arc<dyn CapitalCallRepositoryTrait>,
    allocation_repository: Arc<dyn AllocationRepositoryTrait>,
    event_sink: Arc<dyn DomainEventSink>,
    transaction_executor: E,
}

impl<E: DbTransactionExecutor + Send + Sync> CapitalCallService<E> {
    /// Creates a new CapitalCallService instance.
    pub fn new(
        call_repository: Arc<dyn CapitalCallRepositoryTrait>,
        allocation_repository: Arc<dyn AllocationRepositoryTrait>,
        event_sink: Arc<dyn DomainEventSink>,
        transaction_executor: E,
    ) -> Self {
        Self {
            call_repository,
            allocation_repository,
            event_sink,
            transaction_executor,
        }
    }
}

#[async_trait::async_trait]
impl<E: DbTransactionExecutor + Send + Sync> CapitalCallServiceTrait for CapitalCallService<E> {
    async fn create_call(&self, new_call: NewCapitalCall) -> Result<CallOutcome> {
        new_call.validate()?;
        debug!("Creating capital call for allocation {}", new_call.allocation_id);

        let call_repository = self.call_repository.clone();
        let allocation_repository = self.allocation_repository.clone();

        let outcome = with_write_retry("create_call", || {
            let call_repository = call_repository.clone();
            let allocation_repository = allocation_repository.clone();
            let new_call = new_call.clone();

            self.transaction_executor.execute(move |conn| {
                let allocation =
                    allocation_repository.get_in_transaction(&new_call.allocation_id, conn)?;

                // Idempotent replay: a retry with the same key returns the
                // original call and leaves the ledger untouched.
                if let Some(key) = &new_call.idempotency_key {
                    if let Some(existing) =
                        call_repository.find_by_idempotency_key_in_transaction(key, conn)?
                    {
                        return Ok::<_, Error>(CallOutcome::new(existing, allocation, true));
                    }
                }

                // The call rows are the source of truth for the invariant;
                // recompute rather than trust the cached aggregates.
                let calls =
                    call_repository.list_for_allocation_in_transaction(&allocation.id, conn)?;
                let called = Amount::sum(calls.iter().map(|c| c.call_amount))?;
                let funded = Amount::sum(calls.iter().map(|c| c.paid_amount))?;
                if called != allocation.called_amount || funded != allocation.funded_amount {
                    warn!(
                        "Aggregate drift on allocation {}: cached called/funded {}/{} vs recomputed {}/{}; using recomputed values",
                        allocation.id,
                        allocation.called_amount,
                        allocation.funded_amount,
                        called,
                        funded
                    );
                }

                let snapshot = AllocationSnapshot {
                    allocation_id: allocation.id.clone(),
                    committed: allocation.committed_amount,
                    called,
                    funded,
                    written_off: allocation.written_off_at.is_some(),
                };
                let amount = new_call.amount.resolve(allocation.committed_amount)?;
                let transition = lifecycle::validate_create_call(&snapshot, amount)?;

                let call = call_repository
                    .create_in_transaction(new_call.into_call(amount), conn)?;
                allocation_repository.update_aggregates_in_transaction(
                    &allocation.id,
                    transition.called,
                    transition.funded,
                    conn,
                )?;
                let refreshed =
                    allocation_repository.get_in_transaction(&allocation.id, conn)?;

                Ok(CallOutcome::new(call, refreshed, false))
            })
        })?;

        if !outcome.idempotent_replay {
            self.event_sink.emit(DomainEvent::capital_calls_changed(
                outcome.allocation.id.clone(),
                vec![outcome.call.id.clone()],
                outcome.status,
            ));
        }

        Ok(outcome)
    }

    fn get_call(&self, call_id: &str) -> Result<CapitalCall> {
        self.call_repository.get_by_id(call_id)
    }

    fn get_calls_for_allocation(&self, allocation_id: &str) -> Result<Vec<CapitalCall>> {
        self.call_repository.list_for_allocation(allocation_id)
    }

    fn get_overdue_calls(&self, as_of: chrono::NaiveDate) -> Result<Vec<CapitalCall>> {
        self.call_repository.list_overdue(as_of)
    }
}
