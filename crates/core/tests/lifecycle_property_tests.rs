//! Property-based tests for the lifecycle state machine.
//!
//! These tests drive random operation sequences through the pure validation
//! functions and verify that the ordering invariant
//! `0 <= funded <= called <= committed` holds after every accepted event,
//! and that rejected events carry the figures the caller needs.

use proptest::prelude::*;
use rust_decimal::Decimal;

use fundledger_core::lifecycle::{
    status_for, valid_events, validate_adjust_commitment, validate_create_call,
    validate_payment, validate_reversal, validate_write_off, AllocationSnapshot,
    AllocationStatus, CallSnapshot, LifecycleEventKind,
};
use fundledger_core::money::Amount;

// =============================================================================
// Generators
// =============================================================================

fn cents(raw: u64) -> Amount {
    Amount::new(Decimal::new(raw as i64, 2)).unwrap()
}

/// A randomly chosen ledger operation with raw cent figures.
#[derive(Debug, Clone)]
enum Op {
    CreateCall(u64),
    Payment { call_index: usize, raw: u64 },
    Reverse { call_index: usize, raw: u64 },
    AdjustCommitment(u64),
    WriteOff,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u64..50_000_00).prop_map(Op::CreateCall),
        ((0usize..8), (1u64..50_000_00)).prop_map(|(call_index, raw)| Op::Payment {
            call_index,
            raw
        }),
        ((0usize..8), (1u64..50_000_00)).prop_map(|(call_index, raw)| Op::Reverse {
            call_index,
            raw
        }),
        (1u64..200_000_00).prop_map(Op::AdjustCommitment),
        Just(Op::WriteOff),
    ]
}

/// In-test model of one allocation and its calls, mutated only through
/// accepted transitions.
#[derive(Debug, Clone)]
struct Model {
    snapshot: AllocationSnapshot,
    calls: Vec<CallSnapshot>,
}

impl Model {
    fn new(committed_raw: u64) -> Self {
        Self {
            snapshot: AllocationSnapshot {
                allocation_id: "a1".to_string(),
                committed: cents(committed_raw),
                called: Amount::ZERO,
                funded: Amount::ZERO,
                written_off: false,
            },
            calls: Vec::new(),
        }
    }

    fn invariant_holds(&self) -> bool {
        self.snapshot.funded <= self.snapshot.called
            && self.snapshot.called <= self.snapshot.committed
    }

    fn open_call_count(&self) -> usize {
        self.calls.iter().filter(|c| c.is_open()).count()
    }

    /// Applies one op through the state machine; returns whether it was
    /// accepted.
    fn apply(&mut self, op: &Op) -> bool {
        match op {
            Op::CreateCall(raw) => {
                match validate_create_call(&self.snapshot, cents(*raw)) {
                    Ok(t) => {
                        self.calls.push(CallSnapshot {
                            call_id: format!("c{}", self.calls.len()),
                            allocation_id: self.snapshot.allocation_id.clone(),
                            call_amount: cents(*raw),
                            paid_amount: Amount::ZERO,
                        });
                        self.snapshot.called = t.called;
                        self.snapshot.funded = t.funded;
                        true
                    }
                    Err(_) => false,
                }
            }
            Op::Payment { call_index, raw } => {
                let Some(call) = self.calls.get(*call_index).cloned() else {
                    return false;
                };
                let amount = cents(*raw);
                match validate_payment(&self.snapshot, &call, self.open_call_count(), amount) {
                    Ok(t) => {
                        let call = &mut self.calls[*call_index];
                        call.paid_amount = call.paid_amount.checked_add(amount).unwrap();
                        self.snapshot.called = t.called;
                        self.snapshot.funded = t.funded;
                        true
                    }
                    Err(_) => false,
                }
            }
            Op::Reverse { call_index, raw } => {
                let Some(call) = self.calls.get(*call_index).cloned() else {
                    return false;
                };
                let amount = cents(*raw);
                // The whole paid amount of the call acts as a single
                // reversible payment in this model.
                match validate_reversal(&self.snapshot, &call, "p", call.paid_amount, amount) {
                    Ok(t) => {
                        let call = &mut self.calls[*call_index];
                        call.paid_amount = call.paid_amount.checked_sub(amount).unwrap();
                        self.snapshot.called = t.called;
                        self.snapshot.funded = t.funded;
                        true
                    }
                    Err(_) => false,
                }
            }
            Op::AdjustCommitment(raw) => {
                match validate_adjust_commitment(&self.snapshot, cents(*raw)) {
                    Ok(_) => {
                        self.snapshot.committed = cents(*raw);
                        true
                    }
                    Err(_) => false,
                }
            }
            Op::WriteOff => match validate_write_off(&self.snapshot) {
                Ok(_) => {
                    self.snapshot.written_off = true;
                    true
                }
                Err(_) => false,
            },
        }
    }
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// The ordering invariant holds after every accepted operation, no
    /// matter the sequence.
    #[test]
    fn prop_invariant_holds_under_any_sequence(
        committed_raw in 1u64..100_000_00,
        ops in proptest::collection::vec(arb_op(), 0..40)
    ) {
        let mut model = Model::new(committed_raw);
        prop_assert!(model.invariant_holds());

        for op in &ops {
            let before = model.clone();
            let accepted = model.apply(op);
            if !accepted {
                // A rejected event leaves the derived amounts untouched.
                prop_assert_eq!(&model.snapshot, &before.snapshot);
            }
            prop_assert!(
                model.invariant_holds(),
                "invariant broken after {:?}: {:?}",
                op,
                model.snapshot
            );
        }
    }

    /// Per-call bound: no call's paid amount ever exceeds its call amount.
    #[test]
    fn prop_paid_never_exceeds_call(
        committed_raw in 1u64..100_000_00,
        ops in proptest::collection::vec(arb_op(), 0..40)
    ) {
        let mut model = Model::new(committed_raw);
        for op in &ops {
            model.apply(op);
            for call in &model.calls {
                prop_assert!(call.paid_amount <= call.call_amount);
                prop_assert!(call.outstanding() <= call.call_amount);
            }
        }
    }

    /// No event is ever accepted on a written-off allocation.
    #[test]
    fn prop_written_off_is_terminal(
        committed_raw in 1u64..100_000_00,
        ops in proptest::collection::vec(arb_op(), 0..40)
    ) {
        let mut model = Model::new(committed_raw);
        let mut written_off = false;
        for op in &ops {
            let accepted = model.apply(op);
            if written_off {
                prop_assert!(!accepted, "accepted {:?} after write-off", op);
            }
            if matches!(op, Op::WriteOff) && accepted {
                written_off = true;
                prop_assert!(valid_events(&model.snapshot).is_empty());
            }
        }
    }

    /// The derived status always matches the pure amount mapping, and the
    /// valid-events set is consistent with it.
    #[test]
    fn prop_status_and_valid_events_agree(
        committed_raw in 1u64..100_000_00,
        ops in proptest::collection::vec(arb_op(), 0..40)
    ) {
        let mut model = Model::new(committed_raw);
        for op in &ops {
            model.apply(op);
            let s = &model.snapshot;
            let status = s.status();
            if s.written_off {
                prop_assert_eq!(status, AllocationStatus::WrittenOff);
            } else {
                prop_assert_eq!(status, status_for(s.committed, s.called, s.funded));
            }

            let events = valid_events(s);
            match status {
                AllocationStatus::WrittenOff => prop_assert!(events.is_empty()),
                AllocationStatus::Funded => {
                    prop_assert_eq!(events, vec![LifecycleEventKind::ReversePayment])
                }
                _ => {
                    prop_assert!(events.contains(&LifecycleEventKind::WriteOff));
                    prop_assert_eq!(
                        events.contains(&LifecycleEventKind::CreateCall),
                        s.called < s.committed
                    );
                    prop_assert_eq!(
                        events.contains(&LifecycleEventKind::PaymentReceived),
                        s.funded < s.called
                    );
                }
            }
        }
    }

    /// status_for maps the amount space exactly onto the five active states.
    #[test]
    fn prop_status_for_covers_amount_space(
        committed_raw in 1u64..100_000_00,
        called_pct in 0u64..=100,
        funded_pct in 0u64..=100
    ) {
        let committed = cents(committed_raw);
        let called = cents(committed_raw * called_pct / 100);
        let funded = cents(committed_raw * called_pct / 100 * funded_pct / 100);

        let status = status_for(committed, called, funded);
        if called.is_zero() {
            prop_assert_eq!(status, AllocationStatus::Committed);
        } else if called < committed {
            // Funded is only reachable once the full commitment is called.
            if funded.is_zero() {
                prop_assert_eq!(status, AllocationStatus::PartiallyCalled);
            } else {
                prop_assert_eq!(status, AllocationStatus::PartiallyFunded);
            }
        } else if funded.is_zero() {
            prop_assert_eq!(status, AllocationStatus::Called);
        } else if funded < called {
            prop_assert_eq!(status, AllocationStatus::PartiallyFunded);
        } else {
            prop_assert_eq!(status, AllocationStatus::Funded);
        }
    }
}
