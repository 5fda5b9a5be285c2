//! Error types for stock_ledger

use rusqlite::ffi;
use thiserror::Error;

/// Unified error type for ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed or missing input, rejected before storage is touched
    #[error("Validation error: {0}")]
    Validation(String),
    /// Registration attempted with a username that already exists
    #[error("Username already taken: {0}")]
    DuplicateUsername(String),
    /// The owner already has an item with this code
    #[error("Item code already exists: {0}")]
    DuplicateCode(String),
    /// Username/password pair did not match any account
    #[error("Invalid username or password")]
    InvalidCredentials,
    /// Update/delete targeted a row that does not exist for this owner
    #[error("Not found: {0}")]
    NotFound(String),
    /// Connection, configuration or driver failure
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
    /// File I/O error (report writing)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        LedgerError::StorageUnavailable(err.to_string())
    }
}

impl From<config::ConfigError> for LedgerError {
    fn from(err: config::ConfigError) -> Self {
        LedgerError::Config(err.to_string())
    }
}

impl From<csv::Error> for LedgerError {
    fn from(err: csv::Error) -> Self {
        LedgerError::Io(std::io::Error::other(err))
    }
}

/// Whether a driver error is a primary-key/unique constraint violation.
///
/// Checks, foreign keys and NOT NULL violations are not uniqueness failures
/// and stay generic.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
                && (e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE)
        }
        _ => false,
    }
}

/// Result alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;
