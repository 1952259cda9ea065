//! Capital calls module.
//!
//! A capital call is a request to draw down part of a commitment. Calls are
//! created through the service (never directly), validated by the lifecycle
//! state machine inside the same transaction that persists them, and only
//! ever deleted as part of a cascading allocation cleanup.

pub mod capital_calls_model;
pub mod capital_calls_service;
pub mod capital_calls_traits;


pub use capital_calls_model::*;
pub use capital_calls_service::CapitalCallService;
pub use capital_calls_traits::*;
