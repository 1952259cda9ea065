//! Fundledger Core - Domain entities, services, and traits.
//!
//! This crate contains the core business logic for the capital commitment
//! ledger: allocations (a fund's commitment to a deal), capital calls drawn
//! against them, and payments settling those calls. It is database-agnostic
//! and defines traits that are implemented by the `storage-sqlite` crate.

pub mod allocations;
pub mod capital_calls;
pub mod constants;
pub mod db;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod money;
pub mod payments;
pub mod reconciliation;
pub mod reporting;

// Re-export the amount type and lifecycle statuses; nearly every caller
// needs them.
pub use lifecycle::{AllocationStatus, CapitalCallStatus, LifecycleEventKind};
pub use money::Amount;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
