//! Allocations module.
//!
//! An allocation is one fund's commitment to one deal. It is created in the
//! committed state with zero aggregates and mutated only through capital
//! call and payment events; its status is always derived, never stored.

pub mod allocations_model;
pub mod allocations_service;
pub mod allocations_traits;


pub use allocations_model::*;
pub use allocations_service::AllocationService;
pub use allocations_traits::*;
