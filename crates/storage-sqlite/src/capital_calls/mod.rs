//! SQLite storage implementation for capital calls.

mod model;
mod repository;

pub use model::CapitalCallDB;
pub use repository::CapitalCallRepository;
