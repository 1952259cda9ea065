use chrono::Utc;
use log::{debug, info};
use std::sync::Arc;

use super::allocations_model::{Allocation, AllocationOutcome, NewAllocation};
use super::allocations_traits::{AllocationRepositoryTrait, AllocationServiceTrait};
use crate::db::{with_write_retry, DbTransactionExecutor};
use crate::errors::{ConstraintViolation, Error, Result};
use crate::events::{DomainEvent, DomainEventSink};
use crate::lifecycle;
use crate::money::Amount;

/// Service for managing allocations.
pub struct AllocationService<E: DbTransactionExecutor + Send + Sync> {
    repository: Arc<dyn AllocationRepositoryTrait>,
    event_sink: Arc<dyn DomainEventSink>,
    transaction_executor: E,
}

impl<E: DbTransactionExecutor + Send + Sync> AllocationService<E> {
    /// Creates a new AllocationService instance.
    pub fn new(
        repository: Arc<dyn AllocationRepositoryTrait>,
        event_sink: Arc<dyn DomainEventSink>,
        transaction_executor: E,
    ) -> Self {
        Self {
            repository,
            event_sink,
            transaction_executor,
        }
    }
}

#[async_trait::async_trait]
impl<E: DbTransactionExecutor + Send + Sync> AllocationServiceTrait for AllocationService<E> {
    async fn allocate(&self, new_allocation: NewAllocation) -> Result<AllocationOutcome> {
        new_allocation.validate()?;
        debug!(
            "Allocating fund {} into deal {} for {}",
            new_allocation.fund_id, new_allocation.deal_id, new_allocation.committed_amount
        );

        let repository = self.repository.clone();
        let allocation = new_allocation.into_allocation();

        let created = with_write_retry("allocate", || {
            let repository = repository.clone();
            let candidate = allocation.clone();
            self.transaction_executor.execute(move |conn| {
                // Application-level uniqueness check; the unique index on
                // (fund_id, deal_id) is the second line of defense.
                if let Some(existing) = repository.find_by_fund_and_deal_in_transaction(
                    &candidate.fund_id,
                    &candidate.deal_id,
                    conn,
                )? {
                    return Err(ConstraintViolation::DuplicateAllocation {
                        fund_id: candidate.fund_id.clone(),
                        deal_id: candidate.deal_id.clone(),
                        existing_id: existing.id,
                    }
                    .into());
                }
                repository.create_in_transaction(candidate, conn)
            })
        })?;

        self.event_sink.emit(DomainEvent::allocations_changed(
            vec![created.id.clone()],
            vec![created.fund_id.clone()],
        ));

        Ok(AllocationOutcome::from(created))
    }

    fn get_allocation(&self, allocation_id: &str) -> Result<AllocationOutcome> {
        Ok(AllocationOutcome::from(
            self.repository.get_by_id(allocation_id)?,
        ))
    }

    fn list_allocations(&self) -> Result<Vec<Allocation>> {
        self.repository.list(None)
    }

    fn get_allocations_by_fund(&self, fund_id: &str) -> Result<Vec<Allocation>> {
        self.repository.list(Some(fund_id))
    }

    async fn adjust_commitment(
        &self,
        allocation_id: &str,
        new_amount: Amount,
        reason: &str,
    ) -> Result<AllocationOutcome> {
        if new_amount.is_zero() {
            return Err(crate::errors::ValidationError::NonPositiveAmount(
                new_amount.to_string(),
            )
            .into());
        }

        let repository = self.repository.clone();
        let id = allocation_id.to_string();

        let (updated, old_amount) = with_write_retry("adjust_commitment", || {
            let repository = repository.clone();
            let id = id.clone();
            self.transaction_executor.execute(move |conn| {
                let allocation = repository.get_in_transaction(&id, conn)?;
                lifecycle::validate_adjust_commitment(&allocation.snapshot(), new_amount)?;
                repository.set_committed_amount_in_transaction(&id, new_amount, conn)?;
                let updated = repository.get_in_transaction(&id, conn)?;
                Ok::<_, Error>((updated, allocation.committed_amount))
            })
        })?;

        info!(
            "Adjusted commitment of allocation {} from {} to {} ({})",
            allocation_id, old_amount, new_amount, reason
        );
        self.event_sink.emit(DomainEvent::CommitmentAdjusted {
            allocation_id: allocation_id.to_string(),
            old_amount: old_amount.to_string(),
            new_amount: new_amount.to_string(),
            reason: reason.to_string(),
        });

        Ok(AllocationOutcome::from(updated))
    }

    async fn write_off(&self, allocation_id: &str, reason: &str) -> Result<AllocationOutcome> {
        let repository = self.repository.clone();
        let id = allocation_id.to_string();

        let updated = with_write_retry("write_off", || {
            let repository = repository.clone();
            let id = id.clone();
            self.transaction_executor.execute(move |conn| {
                let allocation = repository.get_in_transaction(&id, conn)?;
                lifecycle::validate_write_off(&allocation.snapshot())?;
                repository.set_written_off_in_transaction(&id, Utc::now().naive_utc(), conn)?;
                repository.get_in_transaction(&id, conn)
            })
        })?;

        info!("Wrote off allocation {} ({})", allocation_id, reason);
        self.event_sink.emit(DomainEvent::allocations_changed(
            vec![updated.id.clone()],
            vec![updated.fund_id.clone()],
        ));

        Ok(AllocationOutcome::from(updated))
    }

    async fn delete_allocation(&self, allocation_id: &str) -> Result<()> {
        let repository = self.repository.clone();
        let id = allocation_id.to_string();

        let deleted = with_write_retry("delete_allocation", || {
            let repository = repository.clone();
            let id = id.clone();
            self.transaction_executor.execute(move |conn| {
                let allocation = repository.get_in_transaction(&id, conn)?;
                repository.delete_in_transaction(&id, conn)?;
                Ok::<_, Error>(allocation)
            })
        })?;

        info!(
            "Deleted allocation {} (fund {}, deal {}) with cascading cleanup",
            deleted.id, deleted.fund_id, deleted.deal_id
        );
        self.event_sink.emit(DomainEvent::allocations_changed(
            vec![deleted.id],
            vec![deleted.fund_id],
        ));

        Ok(())
    }
}
