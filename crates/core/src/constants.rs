//! Shared constants for the ledger.

/// Display-facing decimal places for currency amounts.
pub const AMOUNT_SCALE: u32 = 2;

/// Maximum attempts for a write that failed with a concurrency conflict.
pub const WRITE_RETRY_ATTEMPTS: u32 = 3;

/// Upper bound for an allocation's portfolio weight, in percent.
pub const MAX_PORTFOLIO_WEIGHT: i64 = 100;
