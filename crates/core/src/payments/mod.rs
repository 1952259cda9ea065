//! Payments module.
//!
//! A payment is a recorded transfer settling part of a capital call. A
//! payment may never exist without a call, and a recorded payment is
//! immutable: corrections are new offsetting reversal records, preserving
//! the audit trail.

pub mod payments_model;
pub mod payments_service;
pub mod payments_traits;


pub use payments_model::*;
pub use payments_service::PaymentService;
pub use payments_traits::*;
