//! Error types for pointer operations.

use ballast_types::{BlockId, KeyId};
use thiserror::Error;

/// Errors that can occur during pointer operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// No signing key is registered for the writer.
    #[error("no signing key registered for writer {0}")]
    UnknownKey(KeyId),

    /// The CAS payload's signature did not verify against the writer's key.
    #[error("signature rejected for writer {0}")]
    Unauthorized(KeyId),

    /// The signed payload did not decode as a CAS pair.
    #[error("malformed CAS payload for writer {0}")]
    MalformedPayload(KeyId),

    /// The pointer moved since the pair was signed.
    #[error("CAS conflict for writer {writer}: expected {expected:?}, found {found:?}")]
    CasConflict {
        writer: KeyId,
        expected: Option<BlockId>,
        found: Option<BlockId>,
    },

    /// Error from the block store while resolving a signing key.
    #[error(transparent)]
    Store(#[from] ballast_store::StoreError),

    /// Serialization or lock failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience type alias for pointer operations.
pub type Result<T> = std::result::Result<T, RefError>;
