//! Error taxonomy for the runner: configuration, data, storage, and
//! exit-logic-invariant errors are distinguished at the type level so the
//! bar loop can decide fatal-vs-recoverable from the error tag rather than
//! from exception-handling control flow.

use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config field `{field}` out of valid range: {reason}")]
    OutOfRange { field: String, reason: String },
    #[error("cross-field invariant violated: {0}")]
    InvariantViolation(String),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("config validation failed: {0}")]
    Config(#[from] ConfigError),
    #[error("output directory `{0}` is not writable")]
    OutputDirNotWritable(String),
    #[error("storage store `{store}` could not be opened: {source}")]
    StoreUnopenable { store: String, source: StorageError },
    #[error("data unavailable for requested range: {0}")]
    DataUnavailable(String),
}

/// A data error references the offending symbol/timestamp so a failure can
/// be diagnosed without re-running the engine.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("bar timestamps out of order for {symbol}: {prev} then {next}")]
    OutOfOrder {
        symbol: String,
        prev: chrono::DateTime<chrono::Utc>,
        next: chrono::DateTime<chrono::Utc>,
    },
    #[error("non-finite OHLCV field in bar for {symbol} at {timestamp}")]
    VoidBar {
        symbol: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Preflight(#[from] PreflightError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("exit-logic invariant violated: {0}")]
    InvariantViolation(String),
    #[error("checkpoint error: {0}")]
    Checkpoint(String),
}
