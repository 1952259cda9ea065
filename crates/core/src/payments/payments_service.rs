use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;

use super::payments_model::{
    net_paid, unreversed_remainder, NewPayment, Payment, PaymentKind, PaymentOutcome,
};
use super::payments_traits::{PaymentRepositoryTrait, PaymentServiceTrait};
use crate::allocations::AllocationRepositoryTrait;
use crate::capital_calls::{CapitalCall, CapitalCallRepositoryTrait};
use crate::db::{with_write_retry, DbTransactionExecutor};
use crate::errors::ValidationError;
use crate::events::{DomainEvent, DomainEventSink};
use crate::lifecycle::{self, AllocationSnapshot, CallSnapshot};
use crate::money::Amount;
use crate::{Error, Result};

/// Service for recording payments and reversals.
///
/// Both operations load the call and its owning allocation inside one
/// write-locked transaction, validate through the state machine (including
/// the no-open-call rule), insert the record, and recompute the call's and
/// allocation's aggregates before committing.
pub struct PaymentService<E: DbTransactionExecutor + Send + Sync> {
    payment_repository: Arc<dyn PaymentRepositoryTrait>,
    call_repository: Arc<dyn CapitalCallRepositoryTrait>,
    allocation_repository: Arc<dyn AllocationRepositoryTrait>,
    event_sink: Arc<dyn DomainEventSink>,
    transaction_executor: E,
}

impl<E: DbTransactionExecutor + Send + Sync> PaymentService<E> {
    /// Creates a new PaymentService instance.
    pub fn new(
        payment_repository: Arc<dyn PaymentRepositoryTrait>,
        call_repository: Arc<dyn CapitalCallRepositoryTrait>,
        allocation_repository: Arc<dyn AllocationRepositoryTrait>,
        event_sink: Arc<dyn DomainEventSink>,
        transaction_executor: E,
    ) -> Self {
        Self {
            payment_repository,
            call_repository,
            allocation_repository,
            event_sink,
            transaction_executor,
        }
    }

    /// Recomputes the allocation-level aggregates from the call rows, with
    /// the target call's paid amount replaced by its freshly netted value.
    fn allocation_aggregates(
        calls: &[CapitalCall],
        target_call_id: &str,
        target_paid: Amount,
    ) -> Result<(Amount, Amount, usize)> {
        let called = Amount::sum(calls.iter().map(|c| c.call_amount))?;
        let mut funded = Amount::ZERO;
        let mut open_calls = 0usize;
        for call in calls {
            let paid = if call.id == target_call_id {
                target_paid
            } else {
                call.paid_amount
            };
            if paid < call.call_amount {
                open_calls += 1;
            }
            funded = funded.checked_add(paid)?;
        }
        Ok((called, funded, open_calls))
    }
}

#[async_trait::async_trait]
impl<E: DbTransactionExecutor + Send + Sync> PaymentServiceTrait for PaymentService<E> {
    async fn record_payment(&self, new_payment: NewPayment) -> Result<PaymentOutcome> {
        new_payment.validate()?;
        debug!(
            "Recording payment of {} against call {}",
            new_payment.amount, new_payment.capital_call_id
        );

        let payment_repository = self.payment_repository.clone();
        let call_repository = self.call_repository.clone();
        let allocation_repository = self.allocation_repository.clone();

        let outcome = with_write_retry("record_payment", || {
            let payment_repository = payment_repository.clone();
            let call_repository = call_repository.clone();
            let allocation_repository = allocation_repository.clone();
            let new_payment = new_payment.clone();

            self.transaction_executor.execute(move |conn| {
                let call =
                    call_repository.get_in_transaction(&new_payment.capital_call_id, conn)?;
                let allocation =
                    allocation_repository.get_in_transaction(&call.allocation_id, conn)?;

                if let Some(key) = &new_payment.idempotency_key {
                    if let Some(existing) =
                        payment_repository.find_by_idempotency_key_in_transaction(key, conn)?
                    {
                        return Ok::<_, Error>(PaymentOutcome::new(existing, call, allocation, true));
                    }
                }

                // The payments table is the source of truth for the target
                // call; the sibling calls contribute their maintained caches.
                let records =
                    payment_repository.list_for_call_in_transaction(&call.id, conn)?;
                let paid = net_paid(&records)?;
                let calls = call_repository
                    .list_for_allocation_in_transaction(&allocation.id, conn)?;
                let (called, funded, open_calls) =
                    Self::allocation_aggregates(&calls, &call.id, paid)?;
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
                let call_snapshot = CallSnapshot {
                    call_id: call.id.clone(),
                    allocation_id: call.allocation_id.clone(),
                    call_amount: call.call_amount,
                    paid_amount: paid,
                };
                let transition = lifecycle::validate_payment(
                    &snapshot,
                    &call_snapshot,
                    open_calls,
                    new_payment.amount,
                )?;

                let amount = new_payment.amount;
                let payment =
                    payment_repository.create_in_transaction(new_payment.into_payment(), conn)?;
                call_repository.update_paid_amount_in_transaction(
                    &call.id,
                    paid.checked_add(amount)?,
                    conn,
                )?;
                allocation_repository.update_aggregates_in_transaction(
                    &allocation.id,
                    transition.called,
                    transition.funded,
                    conn,
                )?;

                let call = call_repository.get_in_transaction(&call.id, conn)?;
                let allocation =
                    allocation_repository.get_in_transaction(&allocation.id, conn)?;
                Ok(PaymentOutcome::new(payment, call, allocation, false))
            })
        })?;

        if !outcome.idempotent_replay {
            self.emit_changed(&outcome);
        }
        Ok(outcome)
    }

    async fn reverse_payment(
        &self,
        payment_id: &str,
        amount: Amount,
        reason: &str,
    ) -> Result<PaymentOutcome> {
        if amount.is_zero() {
            return Err(ValidationError::NonPositiveAmount(amount.to_string()).into());
        }

        let payment_repository = self.payment_repository.clone();
        let call_repository = self.call_repository.clone();
        let allocation_repository = self.allocation_repository.clone();
        let id = payment_id.to_string();

        let outcome = with_write_retry("reverse_payment", || {
            let payment_repository = payment_repository.clone();
            let call_repository = call_repository.clone();
            let allocation_repository = allocation_repository.clone();
            let id = id.clone();

            self.transaction_executor.execute(move |conn| {
                let original = payment_repository.get_in_transaction(&id, conn)?;
                if original.kind == PaymentKind::Reversal {
                    return Err::<PaymentOutcome, Error>(ValidationError::InvalidInput(
                        "a reversal cannot itself be reversed".to_string(),
                    )
                    .into());
                }

                let call =
                    call_repository.get_in_transaction(&original.capital_call_id, conn)?;
                let allocation =
                    allocation_repository.get_in_transaction(&call.allocation_id, conn)?;

                let records =
                    payment_repository.list_for_call_in_transaction(&call.id, conn)?;
                let paid = net_paid(&records)?;
                let remaining = unreversed_remainder(&original, &records)?;
                let calls = call_repository
                    .list_for_allocation_in_transaction(&allocation.id, conn)?;
                let (called, funded, _) =
                    Self::allocation_aggregates(&calls, &call.id, paid)?;

                let snapshot = AllocationSnapshot {
                    allocation_id: allocation.id.clone(),
                    committed: allocation.committed_amount,
                    called,
                    funded,
                    written_off: allocation.written_off_at.is_some(),
                };
                let call_snapshot = CallSnapshot {
                    call_id: call.id.clone(),
                    allocation_id: call.allocation_id.clone(),
                    call_amount: call.call_amount,
                    paid_amount: paid,
                };
                let transition = lifecycle::validate_reversal(
                    &snapshot,
                    &call_snapshot,
                    &original.id,
                    remaining,
                    amount,
                )?;

                let reversal = Payment {
                    id: uuid::Uuid::new_v4().to_string(),
                    capital_call_id: call.id.clone(),
                    amount,
                    payment_date: Utc::now().date_naive(),
                    kind: PaymentKind::Reversal,
                    reverses_payment_id: Some(original.id.clone()),
                    tx_ref: None,
                    idempotency_key: None,
                    created_at: Utc::now().naive_utc(),
                };
                let reversal = payment_repository.create_in_transaction(reversal, conn)?;
                call_repository.update_paid_amount_in_transaction(
                    &call.id,
                    paid.checked_sub(amount)?,
                    conn,
                )?;
                allocation_repository.update_aggregates_in_transaction(
                    &allocation.id,
                    transition.called,
                    transition.funded,
                    conn,
                )?;

                let call = call_repository.get_in_transaction(&call.id, conn)?;
                let allocation =
                    allocation_repository.get_in_transaction(&allocation.id, conn)?;
                Ok(PaymentOutcome::new(reversal, call, allocation, false))
            })
        })?;

        info!(
            "Reversed {} of payment {} on call {} ({})",
            amount, payment_id, outcome.call.id, reason
        );
        self.emit_changed(&outcome);
        Ok(outcome)
    }

    fn get_payment(&self, payment_id: &str) -> Result<Payment> {
        self.payment_repository.get_by_id(payment_id)
    }

    fn get_payments_for_call(&self, capital_call_id: &str) -> Result<Vec<Payment>> {
        self.payment_repository.list_for_call(capital_call_id)
    }
}

impl<E: DbTransactionExecutor + Send + Sync> PaymentService<E> {
    fn emit_changed(&self, outcome: &PaymentOutcome) {
        self.event_sink.emit(DomainEvent::payments_changed(
            outcome.allocation.id.clone(),
            outcome.call.id.clone(),
            vec![outcome.payment.id.clone()],
            outcome.status,
        ));
    }
}
