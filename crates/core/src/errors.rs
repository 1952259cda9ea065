//! Core error types for the ledger.
//!
//! This module defines database-agnostic error types. Storage-specific errors
//! (from Diesel, SQLite, etc.) are converted to these types by the storage
//! layer.

use chrono::ParseError as ChronoParseError;
use thiserror::Error;

use crate::money::Amount;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the ledger.
///
/// Validation and constraint errors are always reported synchronously with
/// enough detail for the caller to self-correct. Concurrency conflicts are
/// retried internally a bounded number of times before surfacing. Integrity
/// faults are never raised to interactive callers - they are recorded by the
/// reconciliation workflow.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(#[from] ConstraintViolation),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Concurrent write conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("Integrity fault on existing data: {0}")]
    IntegrityFault(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Shorthand for a NotFound error.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// True when retrying the whole operation from scratch may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ConcurrencyConflict(_))
    }
}

/// Database-agnostic error type for storage operations.
///
/// The storage layer converts Diesel/r2d2 errors into this format so the
/// core stays free of driver types.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    /// A database query failed to execute.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A unique constraint was violated (e.g., duplicate key).
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// A foreign key constraint was violated.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A database transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Database migration failed.
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Internal/unexpected database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// A financial invariant would be broken by the attempted operation.
///
/// Each variant carries the current and attempted figures so the caller can
/// adjust without re-deriving ledger state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintViolation {
    #[error(
        "call of {attempted} would exceed commitment: {already_called} of {committed} already called"
    )]
    OverCall {
        committed: Amount,
        already_called: Amount,
        attempted: Amount,
    },

    #[error(
        "payment of {attempted} would exceed call amount: {already_paid} of {call_amount} already paid"
    )]
    OverPayment {
        call_amount: Amount,
        already_paid: Amount,
        attempted: Amount,
    },

    #[error("allocation {allocation_id} has no open capital call to pay against")]
    PaymentWithoutOpenCall { allocation_id: String },

    #[error("allocation for fund {fund_id} and deal {deal_id} already exists as {existing_id}")]
    DuplicateAllocation {
        fund_id: String,
        deal_id: String,
        existing_id: String,
    },

    #[error("commitment of {attempted} would fall below already-called {called}")]
    CommitmentBelowCalled { called: Amount, attempted: Amount },

    #[error("reversal of {attempted} exceeds the unreversed remainder {remaining} of payment {payment_id}")]
    OverReversal {
        payment_id: String,
        remaining: Amount,
        attempted: Amount,
    },

    #[error("allocation {allocation_id} is in terminal state {state} and accepts no further events")]
    TerminalState {
        allocation_id: String,
        state: &'static str,
    },
}

/// Validation errors for user input and data parsing.
///
/// Rejected before any lock is taken; always recoverable by correcting input.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(String),

    #[error("Amount may not be negative, got {0}")]
    NegativeAmount(String),

    #[error("Amount arithmetic overflowed")]
    AmountOverflow,

    #[error("Portfolio weight {0} is outside [0, 100]")]
    PortfolioWeightOutOfRange(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),
}

// === From implementations for common error types ===

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
