//! Reconciliation module.
//!
//! The integrity engine inspects the ledger for broken invariants and
//! repairs what can be repaired deterministically. It follows a check-based
//! architecture:
//!
//! ```text
//! IntegrityService → [Checks] → IntegrityViolation[]
//!      ↓
//! report() (dry run)  /  repair() (per-allocation transactions)
//! ```
//!
//! - **Models** (`model.rs`) - Severity, IntegrityViolation, IntegrityReport,
//!   RepairSummary
//! - **Traits** (`traits.rs`) - check and repository interfaces, plus the
//!   `LedgerSnapshot` the checks analyze
//! - **Checks** (`checks/`) - aggregate drift, duplicate allocations,
//!   orphaned payments
//! - **Validator** (`validator.rs`) - pure row-level predicates shared by
//!   the checks and the write paths
//! - **Service** (`service.rs`) - orchestrates checks and repairs
//!
//! Violations are logged and returned as structured values; read paths never
//! throw on broken existing data.

pub mod checks;
pub mod model;
pub mod service;
pub mod traits;
pub mod validator;

#[cfg(test)]
mod tests;

pub use checks::{AggregateDriftCheck, DuplicateAllocationCheck, OrphanedPaymentCheck};
pub use model::{
    IntegrityCategory, IntegrityReport, IntegrityViolation, RepairSummary, Severity,
};
pub use service::IntegrityService;
pub use traits::{
    IntegrityCheck, IntegrityRepositoryTrait, IntegrityServiceTrait, LedgerSnapshot,
};
