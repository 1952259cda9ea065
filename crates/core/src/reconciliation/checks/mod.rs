//! Integrity check implementations.
//!
//! - Aggregate drift check (cached sums vs rows)
//! - Duplicate allocation check (`(fund_id, deal_id)` uniqueness)
//! - Orphaned payment check (dangling call references)

pub mod aggregate_drift;
pub mod duplicate_allocations;
pub mod orphaned_payments;

pub use aggregate_drift::{recompute_aggregates, AggregateDriftCheck, DriftFinding};
pub use duplicate_allocations::{DuplicateAllocationCheck, DuplicateGroup};
pub use orphaned_payments::OrphanedPaymentCheck;
