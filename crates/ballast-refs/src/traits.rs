//! The [`PointerStore`] trait defining the mutable-pointer interface.
//!
//! Any backend (in-memory, networked, database) implements this trait to
//! provide authenticated compare-and-swap pointer storage.

use ballast_types::{BlockId, KeyId};

use crate::error::Result;

/// Storage backend for writer-controlled mutable pointers.
///
/// Implementations must be thread-safe (`Send + Sync`). Each writer key
/// controls exactly one pointer holding at most one target; an absent entry
/// means the pointer is empty. The `owner` argument identifies the billing
/// namespace a caller is operating in; lookups resolve by writer.
pub trait PointerStore: Send + Sync {
    /// Read the current target of a writer's pointer.
    ///
    /// Returns `Ok(None)` if the pointer is empty or has never been set.
    fn get_target(&self, owner: &KeyId, writer: &KeyId) -> Result<Option<BlockId>>;

    /// Apply a signed compare-and-swap to a writer's pointer.
    ///
    /// `signed_cas` is a sealed envelope over a bincode
    /// [`CasPair`](ballast_types::CasPair). The swap is applied only when the
    /// signature verifies against the writer's registered key and the pair's
    /// `original` matches the current target; otherwise the pointer is left
    /// unchanged and the specific failure is returned.
    fn cas_set(&self, owner: &KeyId, writer: &KeyId, signed_cas: &[u8]) -> Result<()>;
}
