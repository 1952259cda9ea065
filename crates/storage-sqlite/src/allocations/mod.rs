//! SQLite storage implementation for allocations.

mod model;
mod repository;

pub use model::AllocationDB;
pub use repository::AllocationRepository;
