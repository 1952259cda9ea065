//! SQLite storage implementation for the capital commitment ledger.
//!
//! This crate provides all database-related functionality using Diesel ORM
//! with SQLite. It implements the repository traits defined in
//! `fundledger-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - Repository implementations for allocations, capital calls, and payments
//! - Database-specific model types (with Diesel derives)
//!
//! # Architecture
//!
//! This crate is the only place in the application where Diesel queries
//! exist. `core` is database-agnostic and works with traits; every amount
//! column is stored as TEXT and parsed into exact decimals at the boundary.
//!
//! ```text
//!        core (domain services)
//!                 │
//!                 ▼
//!       storage-sqlite (this crate)
//!                 │
//!                 ▼
//!             SQLite DB
//! ```

pub mod conversion;
pub mod db;
pub mod errors;
pub mod schema;

// Repository implementations
pub mod allocations;
pub mod capital_calls;
pub mod payments;
pub mod reconciliation;

// Re-export database utilities
pub use db::{create_pool, get_connection, get_db_path, init, run_migrations};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export from fundledger-core for convenience
pub use fundledger_core::db::{DbConnection, DbPool, DbTransactionExecutor};
pub use fundledger_core::errors::{DatabaseError, Error, Result};
