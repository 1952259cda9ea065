//! Domain events module.
//!
//! Provides domain event types and the sink trait for emitting events after
//! successful ledger mutations. External observers (deal-stage updates,
//! dashboards, metrics refresh) implement the sink; the ledger itself never
//! depends on them.

mod domain_event;
mod sink;

pub use domain_event::*;
pub use sink::*;
