use ballast_types::KeyId;
use thiserror::Error;

/// Errors produced by ledger operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The referenced writer has never been registered.
    #[error("unknown writer key: {0}")]
    UnknownWriter(KeyId),

    /// No aggregate record exists for the owner.
    #[error("no usage record for owner: {0}")]
    UnknownUser(KeyId),

    /// The store has been closed and flushed.
    #[error("usage store is closed")]
    Closed,

    /// Serialization or lock failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
