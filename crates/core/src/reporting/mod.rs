//! Reporting module.
//!
//! Read-only rollups derived strictly from stored allocations and calls.
//! Queries go through the pool without write intent, so they never block a
//! mutation.

pub mod reporting_model;
pub mod reporting_service;
pub mod reporting_traits;


pub use reporting_model::*;
pub use reporting_service::ReportingService;
pub use reporting_traits::*;
