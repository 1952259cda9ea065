//! SQLite storage implementation for the integrity engine.

mod repository;

pub use repository::IntegrityRepository;
