//! Pure lifecycle functions: status derivation and event validation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::{ConstraintViolation, Result};
use crate::money::Amount;

/// Allocation lifecycle status, derived purely from amounts.
///
/// `committed → partially_called → called → partially_funded → funded`,
/// plus terminal `written_off` reachable from any non-funded state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationStatus {
    Committed,
    PartiallyCalled,
    Called,
    PartiallyFunded,
    Funded,
    WrittenOff,
}

impl AllocationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AllocationStatus::Funded | AllocationStatus::WrittenOff)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationStatus::Committed => "COMMITTED",
            AllocationStatus::PartiallyCalled => "PARTIALLY_CALLED",
            AllocationStatus::Called => "CALLED",
            AllocationStatus::PartiallyFunded => "PARTIALLY_FUNDED",
            AllocationStatus::Funded => "FUNDED",
            AllocationStatus::WrittenOff => "WRITTEN_OFF",
        }
    }
}

/// Capital call status, derived from amounts and dates as of a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapitalCallStatus {
    Scheduled,
    Called,
    PartiallyPaid,
    Paid,
    Overdue,
}

/// The events a caller may apply to an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleEventKind {
    CreateCall,
    PaymentReceived,
    ReversePayment,
    AdjustCommitment,
    WriteOff,
}

/// Point-in-time view of an allocation's amounts, as read inside the
/// mutating transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationSnapshot {
    pub allocation_id: String,
    pub committed: Amount,
    pub called: Amount,
    pub funded: Amount,
    pub written_off: bool,
}

impl AllocationSnapshot {
    pub fn status(&self) -> AllocationStatus {
        if self.written_off {
            AllocationStatus::WrittenOff
        } else {
            status_for(self.committed, self.called, self.funded)
        }
    }
}

/// Point-in-time view of a capital call's amounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSnapshot {
    pub call_id: String,
    pub allocation_id: String,
    pub call_amount: Amount,
    pub paid_amount: Amount,
}

impl CallSnapshot {
    /// A call is open while it is not fully paid.
    pub fn is_open(&self) -> bool {
        self.paid_amount < self.call_amount
    }

    pub fn outstanding(&self) -> Amount {
        self.call_amount.saturating_sub(self.paid_amount)
    }
}

/// Result of a successfully validated event: the new derived amounts and the
/// recomputed status. Callers never choose a status by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub called: Amount,
    pub funded: Amount,
    pub status: AllocationStatus,
}

/// Derives allocation status from the three amounts.
///
/// Assumes the global invariant `0 <= funded <= called <= committed`; the
/// services establish it transactionally before this is consulted.
pub fn status_for(committed: Amount, called: Amount, funded: Amount) -> AllocationStatus {
    if called.is_zero() {
        AllocationStatus::Committed
    } else if called < committed {
        if funded.is_zero() {
            AllocationStatus::PartiallyCalled
        } else {
            AllocationStatus::PartiallyFunded
        }
    } else if funded.is_zero() {
        AllocationStatus::Called
    } else if funded < called {
        AllocationStatus::PartiallyFunded
    } else {
        AllocationStatus::Funded
    }
}

/// Derives a capital call's status as of `as_of`.
pub fn call_status_for(
    call_amount: Amount,
    paid_amount: Amount,
    call_date: NaiveDate,
    due_date: NaiveDate,
    as_of: NaiveDate,
) -> CapitalCallStatus {
    if paid_amount >= call_amount {
        CapitalCallStatus::Paid
    } else if as_of > due_date {
        CapitalCallStatus::Overdue
    } else if !paid_amount.is_zero() {
        CapitalCallStatus::PartiallyPaid
    } else if as_of < call_date {
        CapitalCallStatus::Scheduled
    } else {
        CapitalCallStatus::Called
    }
}

/// Validates `CREATE_CALL(amount)` against the current snapshot.
///
/// The amount is already a strictly positive `Amount`; this checks the
/// lifecycle constraints and returns the post-event transition.
pub fn validate_create_call(snapshot: &AllocationSnapshot, amount: Amount) -> Result<Transition> {
    reject_terminal(snapshot)?;

    let new_called = snapshot.called.checked_add(amount)?;
    if new_called > snapshot.committed {
        return Err(ConstraintViolation::OverCall {
            committed: snapshot.committed,
            already_called: snapshot.called,
            attempted: amount,
        }
        .into());
    }

    Ok(Transition {
        called: new_called,
        funded: snapshot.funded,
        status: status_for(snapshot.committed, new_called, snapshot.funded),
    })
}

/// Validates `PAYMENT_RECEIVED(call, amount)`.
///
/// A payment against an allocation with zero open capital calls is always
/// rejected; this is the rule ad-hoc code paths break most often, so it is
/// checked here even though the call lookup usually catches it first.
pub fn validate_payment(
    snapshot: &AllocationSnapshot,
    call: &CallSnapshot,
    open_call_count: usize,
    amount: Amount,
) -> Result<Transition> {
    reject_terminal(snapshot)?;

    if open_call_count == 0 {
        return Err(ConstraintViolation::PaymentWithoutOpenCall {
            allocation_id: snapshot.allocation_id.clone(),
        }
        .into());
    }

    let new_paid = call.paid_amount.checked_add(amount)?;
    if new_paid > call.call_amount {
        return Err(ConstraintViolation::OverPayment {
            call_amount: call.call_amount,
            already_paid: call.paid_amount,
            attempted: amount,
        }
        .into());
    }

    let new_funded = snapshot.funded.checked_add(amount)?;
    Ok(Transition {
        called: snapshot.called,
        funded: new_funded,
        status: status_for(snapshot.committed, snapshot.called, new_funded),
    })
}

/// Validates a reversal of `amount` against a payment with `remaining`
/// unreversed value on a call currently holding `call` amounts.
pub fn validate_reversal(
    snapshot: &AllocationSnapshot,
    call: &CallSnapshot,
    payment_id: &str,
    remaining: Amount,
    amount: Amount,
) -> Result<Transition> {
    if snapshot.written_off {
        return Err(ConstraintViolation::TerminalState {
            allocation_id: snapshot.allocation_id.clone(),
            state: AllocationStatus::WrittenOff.as_str(),
        }
        .into());
    }

    if amount > remaining || amount > call.paid_amount {
        return Err(ConstraintViolation::OverReversal {
            payment_id: payment_id.to_string(),
            remaining,
            attempted: amount,
        }
        .into());
    }

    let new_funded = snapshot.funded.checked_sub(amount)?;
    Ok(Transition {
        called: snapshot.called,
        funded: new_funded,
        status: status_for(snapshot.committed, snapshot.called, new_funded),
    })
}

/// Validates `WRITE_OFF`: allowed from any non-funded, non-written-off state.
pub fn validate_write_off(snapshot: &AllocationSnapshot) -> Result<Transition> {
    reject_terminal(snapshot)?;
    Ok(Transition {
        called: snapshot.called,
        funded: snapshot.funded,
        status: AllocationStatus::WrittenOff,
    })
}

/// Validates `ADJUST_COMMITMENT(new_amount)`: the commitment may move, but
/// never below what has already been called.
pub fn validate_adjust_commitment(
    snapshot: &AllocationSnapshot,
    new_amount: Amount,
) -> Result<Transition> {
    reject_terminal(snapshot)?;

    if new_amount < snapshot.called {
        return Err(ConstraintViolation::CommitmentBelowCalled {
            called: snapshot.called,
            attempted: new_amount,
        }
        .into());
    }

    Ok(Transition {
        called: snapshot.called,
        funded: snapshot.funded,
        status: status_for(new_amount, snapshot.called, snapshot.funded),
    })
}

/// The set of events currently valid for an allocation, so callers can
/// render or guard UI state without re-deriving the state machine.
pub fn valid_events(snapshot: &AllocationSnapshot) -> Vec<LifecycleEventKind> {
    match snapshot.status() {
        AllocationStatus::WrittenOff => Vec::new(),
        // A funded allocation only accepts audit corrections.
        AllocationStatus::Funded => vec![LifecycleEventKind::ReversePayment],
        _ => {
            let mut events = Vec::new();
            if snapshot.called < snapshot.committed {
                events.push(LifecycleEventKind::CreateCall);
            }
            // An open call exists exactly when funding lags calls.
            if snapshot.funded < snapshot.called {
                events.push(LifecycleEventKind::PaymentReceived);
            }
            if !snapshot.funded.is_zero() {
                events.push(LifecycleEventKind::ReversePayment);
            }
            events.push(LifecycleEventKind::AdjustCommitment);
            events.push(LifecycleEventKind::WriteOff);
            events
        }
    }
}

fn reject_terminal(snapshot: &AllocationSnapshot) -> Result<()> {
    let status = snapshot.status();
    if status.is_terminal() {
        return Err(ConstraintViolation::TerminalState {
            allocation_id: snapshot.allocation_id.clone(),
            state: status.as_str(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use rust_decimal_macros::dec;

    fn amt(v: rust_decimal::Decimal) -> Amount {
        Amount::new(v).unwrap()
    }

    fn snapshot(committed: &str, called: &str, funded: &str) -> AllocationSnapshot {
        AllocationSnapshot {
            allocation_id: "alloc-1".to_string(),
            committed: committed.parse().unwrap(),
            called: called.parse().unwrap(),
            funded: funded.parse().unwrap(),
            written_off: false,
        }
    }

    fn call(call_amount: &str, paid: &str) -> CallSnapshot {
        CallSnapshot {
            call_id: "call-1".to_string(),
            allocation_id: "alloc-1".to_string(),
            call_amount: call_amount.parse().unwrap(),
            paid_amount: paid.parse().unwrap(),
        }
    }

    #[test]
    fn test_status_projection() {
        assert_eq!(
            status_for(amt(dec!(100)), amt(dec!(0)), amt(dec!(0))),
            AllocationStatus::Committed
        );
        assert_eq!(
            status_for(amt(dec!(100)), amt(dec!(40)), amt(dec!(0))),
            AllocationStatus::PartiallyCalled
        );
        assert_eq!(
            status_for(amt(dec!(100)), amt(dec!(40)), amt(dec!(10))),
            AllocationStatus::PartiallyFunded
        );
        assert_eq!(
            status_for(amt(dec!(100)), amt(dec!(100)), amt(dec!(0))),
            AllocationStatus::Called
        );
        assert_eq!(
            status_for(amt(dec!(100)), amt(dec!(100)), amt(dec!(40))),
            AllocationStatus::PartiallyFunded
        );
        assert_eq!(
            status_for(amt(dec!(100)), amt(dec!(100)), amt(dec!(100))),
            AllocationStatus::Funded
        );
    }

    #[test]
    fn test_create_call_within_commitment() {
        let t = validate_create_call(&snapshot("1000000", "0", "0"), amt(dec!(400000))).unwrap();
        assert_eq!(t.called, amt(dec!(400000)));
        assert_eq!(t.status, AllocationStatus::PartiallyCalled);
    }

    #[test]
    fn test_create_call_over_commitment_rejected() {
        let err = validate_create_call(&snapshot("1000000", "700000", "0"), amt(dec!(400000)))
            .unwrap_err();
        match err {
            Error::ConstraintViolation(ConstraintViolation::OverCall {
                committed,
                already_called,
                attempted,
            }) => {
                assert_eq!(committed, amt(dec!(1000000)));
                assert_eq!(already_called, amt(dec!(700000)));
                assert_eq!(attempted, amt(dec!(400000)));
            }
            other => panic!("expected OverCall, got {other:?}"),
        }
    }

    #[test]
    fn test_create_call_exactly_fills_commitment() {
        let t = validate_create_call(&snapshot("1000000", "400000", "400000"), amt(dec!(600000)))
            .unwrap();
        assert_eq!(t.called, amt(dec!(1000000)));
        // Funded lags called, so the allocation stays partially funded.
        assert_eq!(t.status, AllocationStatus::PartiallyFunded);
    }

    #[test]
    fn test_payment_with_zero_open_calls_rejected() {
        let err = validate_payment(
            &snapshot("1000", "0", "0"),
            &call("100", "100"),
            0,
            amt(dec!(50)),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::ConstraintViolation(ConstraintViolation::PaymentWithoutOpenCall { .. })
        ));
    }

    #[test]
    fn test_payment_over_call_balance_rejected() {
        let err = validate_payment(
            &snapshot("1000", "400", "100"),
            &call("400", "100"),
            1,
            amt(dec!(301)),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::ConstraintViolation(ConstraintViolation::OverPayment { .. })
        ));
    }

    #[test]
    fn test_partial_payment_produces_partially_funded() {
        let t = validate_payment(
            &snapshot("1000", "400", "0"),
            &call("400", "0"),
            1,
            amt(dec!(150)),
        )
        .unwrap();
        assert_eq!(t.funded, amt(dec!(150)));
        assert_eq!(t.status, AllocationStatus::PartiallyFunded);
    }

    #[test]
    fn test_final_payment_funds_allocation() {
        let t = validate_payment(
            &snapshot("1000", "1000", "600"),
            &call("400", "0"),
            1,
            amt(dec!(400)),
        )
        .unwrap();
        assert_eq!(t.status, AllocationStatus::Funded);
    }

    #[test]
    fn test_events_rejected_on_written_off() {
        let mut s = snapshot("1000", "100", "0");
        s.written_off = true;
        assert!(validate_create_call(&s, amt(dec!(10))).is_err());
        assert!(validate_payment(&s, &call("100", "0"), 1, amt(dec!(10))).is_err());
        assert!(validate_write_off(&s).is_err());
        assert!(valid_events(&s).is_empty());
    }

    #[test]
    fn test_write_off_from_any_non_funded_state() {
        assert!(validate_write_off(&snapshot("1000", "0", "0")).is_ok());
        assert!(validate_write_off(&snapshot("1000", "1000", "500")).is_ok());
        assert!(validate_write_off(&snapshot("1000", "1000", "1000")).is_err());
    }

    #[test]
    fn test_adjust_commitment_below_called_rejected() {
        let err =
            validate_adjust_commitment(&snapshot("1000", "600", "0"), amt(dec!(500))).unwrap_err();
        assert!(matches!(
            err,
            Error::ConstraintViolation(ConstraintViolation::CommitmentBelowCalled { .. })
        ));
        assert!(validate_adjust_commitment(&snapshot("1000", "600", "0"), amt(dec!(600))).is_ok());
    }

    #[test]
    fn test_reversal_bounded_by_remaining() {
        let s = snapshot("1000", "400", "400");
        let c = call("400", "400");
        assert!(validate_reversal(&s, &c, "pay-1", amt(dec!(100)), amt(dec!(100))).is_ok());
        let err =
            validate_reversal(&s, &c, "pay-1", amt(dec!(100)), amt(dec!(101))).unwrap_err();
        assert!(matches!(
            err,
            Error::ConstraintViolation(ConstraintViolation::OverReversal { .. })
        ));
    }

    #[test]
    fn test_call_status_derivation() {
        let d = |s: &str| s.parse::<NaiveDate>().unwrap();
        let today = d("2026-03-15");

        // Fully paid wins over dates.
        assert_eq!(
            call_status_for(amt(dec!(100)), amt(dec!(100)), d("2026-01-01"), d("2026-02-01"), today),
            CapitalCallStatus::Paid
        );
        // Past due and unpaid.
        assert_eq!(
            call_status_for(amt(dec!(100)), amt(dec!(40)), d("2026-01-01"), d("2026-02-01"), today),
            CapitalCallStatus::Overdue
        );
        // Partially paid within the due window.
        assert_eq!(
            call_status_for(amt(dec!(100)), amt(dec!(40)), d("2026-03-01"), d("2026-04-01"), today),
            CapitalCallStatus::PartiallyPaid
        );
        // Issued for a future date.
        assert_eq!(
            call_status_for(amt(dec!(100)), amt(dec!(0)), d("2026-04-01"), d("2026-05-01"), today),
            CapitalCallStatus::Scheduled
        );
        // Issued, unpaid, not yet due.
        assert_eq!(
            call_status_for(amt(dec!(100)), amt(dec!(0)), d("2026-03-01"), d("2026-04-01"), today),
            CapitalCallStatus::Called
        );
    }

    #[test]
    fn test_valid_events_follow_state() {
        let events = valid_events(&snapshot("1000", "0", "0"));
        assert!(events.contains(&LifecycleEventKind::CreateCall));
        assert!(!events.contains(&LifecycleEventKind::PaymentReceived));
        assert!(events.contains(&LifecycleEventKind::WriteOff));

        let events = valid_events(&snapshot("1000", "1000", "400"));
        assert!(!events.contains(&LifecycleEventKind::CreateCall));
        assert!(events.contains(&LifecycleEventKind::PaymentReceived));
        assert!(events.contains(&LifecycleEventKind::ReversePayment));

        let events = valid_events(&snapshot("1000", "1000", "1000"));
        assert_eq!(events, vec![LifecycleEventKind::ReversePayment]);
    }
}
