use ballast_types::{BlockId, KeyId};
use thiserror::Error;

/// Errors produced by the space accounting engine.
///
/// Policy rejections (quota, replay, CAS conflicts) are expected operating
/// conditions a caller handles; the remaining variants indicate upstream
/// ordering bugs or collaborator failures.
#[derive(Debug, Error)]
pub enum SpaceError {
    /// A signature did not verify or a signed payload did not decode.
    #[error("authentication failed for key {0}")]
    Auth(KeyId),

    /// The event's signed `original` does not match the recorded target.
    #[error(
        "CAS conflict for writer {writer}: signed original {signed:?}, recorded target {recorded:?}"
    )]
    CasConflict {
        writer: KeyId,
        signed: Option<BlockId>,
        recorded: Option<BlockId>,
    },

    /// An operation referenced a writer that was never registered.
    #[error("unknown writer key: {0}")]
    UnknownWriter(KeyId),

    /// A write was refused because it would exceed the owner's quota.
    #[error(
        "storage quota reached: used {usage} of {quota} bytes, rejecting write of {attempted} bytes"
    )]
    QuotaExceeded {
        usage: u64,
        quota: u64,
        attempted: u64,
    },

    /// A signed request was older than the replay window.
    #[error("stale signed request: {age_millis} ms old")]
    StaleRequest { age_millis: u64 },

    /// Error from the content-addressed block store.
    #[error(transparent)]
    Store(#[from] ballast_store::StoreError),

    /// Error from the mutable pointer layer.
    #[error(transparent)]
    Refs(#[from] ballast_refs::RefError),

    /// Error from the usage ledger.
    #[error(transparent)]
    Ledger(#[from] ballast_ledger::LedgerError),

    /// Error from the identity directory or quota source.
    #[error("directory error: {0}")]
    Directory(String),
}

impl SpaceError {
    /// Returns `true` for expected policy rejections the caller can surface
    /// to the user, as opposed to invariant violations and I/O failures.
    pub fn is_policy_rejection(&self) -> bool {
        matches!(
            self,
            Self::QuotaExceeded { .. } | Self::StaleRequest { .. } | Self::CasConflict { .. }
        )
    }
}

/// Convenience alias for engine operations.
pub type Result<T> = std::result::Result<T, SpaceError>;
