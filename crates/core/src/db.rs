//! Database transaction abstractions.
//!
//! The core stays driver-light: services depend on `DbTransactionExecutor`
//! and repository traits, while connection pooling, migrations, and the
//! concrete repositories live in the `storage-sqlite` crate.
//!
//! Every mutating ledger operation runs load-validate-write inside a single
//! `immediate_transaction`, which acquires the SQLite write lock before the
//! current aggregates are read. Two concurrent calls, or a call and a
//! payment, therefore cannot interleave on the same allocation.

use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::Error as DieselError;
use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use std::sync::Arc;

use crate::constants::WRITE_RETRY_ATTEMPTS;
use crate::errors::{DatabaseError, Error, Result};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Trait for executing database transactions.
pub trait DbTransactionExecutor {
    /// Executes `f` within an immediate (write-locked) transaction.
    ///
    /// A domain error returned by the closure rolls the transaction back and
    /// is propagated unchanged. Lock contention surfaces as
    /// `Error::ConcurrencyConflict`.
    fn execute<F, T, E>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> std::result::Result<T, E>,
        E: Into<Error>;
}

impl DbTransactionExecutor for DbPool {
    fn execute<F, T, E>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> std::result::Result<T, E>,
        E: Into<Error>,
    {
        let mut conn = self
            .get()
            .map_err(|e| DatabaseError::PoolCreationFailed(e.to_string()))?;

        // The closure's domain error is stashed here so the rollback does not
        // erase it.
        let mut domain_error: Option<Error> = None;

        let result: std::result::Result<T, DieselError> =
            conn.immediate_transaction(|tx_conn| {
                f(tx_conn).map_err(|e| {
                    domain_error = Some(e.into());
                    DieselError::RollbackTransaction
                })
            });

        match result {
            Ok(value) => Ok(value),
            Err(e) => Err(match domain_error.take() {
                Some(err) => err,
                None => map_transaction_error(e),
            }),
        }
    }
}

impl DbTransactionExecutor for Arc<DbPool> {
    fn execute<F, T, E>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> std::result::Result<T, E>,
        E: Into<Error>,
    {
        (**self).execute(f)
    }
}

/// Maps a transaction-level Diesel error to the core taxonomy.
///
/// SQLite reports write-lock contention as "database is locked" once the
/// busy timeout elapses; that is a retryable `ConcurrencyConflict`, not a
/// query failure.
fn map_transaction_error(e: DieselError) -> Error {
    match &e {
        DieselError::DatabaseError(_, info) if info.message().contains("database is locked") => {
            Error::ConcurrencyConflict(info.message().to_string())
        }
        _ => Error::Database(DatabaseError::TransactionFailed(e.to_string())),
    }
}

/// Retries `attempt` when it fails with a retryable conflict.
///
/// Network or lock-contention retries on a financial mutation must not
/// double-apply; each attempt re-reads current state and re-validates inside
/// its own transaction, so retrying the whole operation is safe.
pub fn with_write_retry<T>(op_name: &str, mut attempt: impl FnMut() -> Result<T>) -> Result<T> {
    let mut last_err: Option<Error> = None;
    for n in 1..=WRITE_RETRY_ATTEMPTS {
        match attempt() {
            Err(e) if e.is_retryable() && n < WRITE_RETRY_ATTEMPTS => {
                log::warn!(
                    "{} hit a write conflict (attempt {}/{}), retrying: {}",
                    op_name,
                    n,
                    WRITE_RETRY_ATTEMPTS,
                    e
                );
                last_err = Some(e);
            }
            other => return other,
        }
    }
    Err(last_err.unwrap_or_else(|| Error::Unexpected("retry loop exhausted".to_string())))
}

/// In-memory executor for service unit tests: no pool, no migrations, no
/// retry pressure. The mock repositories ignore the connection entirely.
#[cfg(test)]
pub(crate) struct MockTransactionExecutor;

#[cfg(test)]
impl DbTransactionExecutor for MockTransactionExecutor {
    fn execute<F, T, E>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> std::result::Result<T, E>,
        E: Into<Error>,
    {
        let mut conn = SqliteConnection::establish(":memory:")
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        f(&mut conn).map_err(Into::into)
    }
}
