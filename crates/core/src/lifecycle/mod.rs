//! Allocation lifecycle state machine.
//!
//! The canonical status logic for the ledger. Status is never stored: it is
//! a pure projection of the committed/called/funded amounts (plus the
//! write-off marker), and every mutating event is validated here before it
//! is applied.

mod state_machine;

pub use state_machine::*;
