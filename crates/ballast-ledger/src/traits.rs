use std::collections::BTreeSet;

use ballast_types::{BlockId, KeyId};

use crate::error::Result;
use crate::records::{UserUsage, WriterUsage};

/// Persistence contract for usage accounting.
///
/// Every operation is atomic with respect to the others; in particular
/// [`confirm_usage`](Self::confirm_usage) applies its delta as a single add
/// so that concurrent writers billed to the same owner never lose updates.
/// Implementations must be thread-safe (`Send + Sync`).
pub trait UsageStore: Send + Sync {
    /// Create the aggregate record for `owner` if it does not exist.
    fn add_user_if_absent(&self, owner: &KeyId) -> Result<()>;

    /// Register `writer` as billed to `owner` if not already known.
    ///
    /// Idempotent; an existing record keeps its original owner.
    fn add_writer(&self, owner: &KeyId, writer: &KeyId) -> Result<()>;

    /// Register an identity root and its direct children in one call.
    ///
    /// Used on sign-up and key rotation: ensures the owner aggregate and a
    /// writer record for `root` and each child exist. Sizes and owned-key
    /// sets are untouched; the event processor maintains those.
    fn set_writers(&self, owner: &KeyId, root: &KeyId, children: &BTreeSet<KeyId>) -> Result<()>;

    /// Read a writer's record. `Ok(None)` if the writer is unknown.
    fn writer_usage(&self, writer: &KeyId) -> Result<Option<WriterUsage>>;

    /// Read an owner's aggregate. `Ok(None)` if the owner is unknown.
    fn user_usage(&self, owner: &KeyId) -> Result<Option<UserUsage>>;

    /// Apply a confirmed storage delta to `owner`'s total and release any
    /// reservation held by `writer`.
    ///
    /// A negative delta larger than the recorded total clamps at zero (and
    /// is logged): the ledger must never wrap, and the next reconciliation
    /// sweep repairs the drift.
    fn confirm_usage(&self, owner: &KeyId, writer: &KeyId, delta: i64) -> Result<()>;

    /// Persist a writer's new pointer target, owned-key set, and retained
    /// byte count.
    fn update_writer_usage(
        &self,
        writer: &KeyId,
        target: Option<BlockId>,
        owned_keys: BTreeSet<KeyId>,
        direct_retained: u64,
    ) -> Result<()>;

    /// Reserve `bytes` for an in-flight write by `writer`.
    ///
    /// Reservations accumulate until confirmed or cleared.
    fn add_pending_usage(&self, owner: &KeyId, writer: &KeyId, bytes: u64) -> Result<()>;

    /// Drop any reservation held by `writer`.
    fn clear_pending_usage(&self, owner: &KeyId, writer: &KeyId) -> Result<()>;

    /// Set or clear the sticky quota-rejection flag for `owner`.
    fn set_errored(&self, owner: &KeyId, errored: bool) -> Result<()>;

    /// Every writer key the ledger knows about.
    fn all_writers(&self) -> Result<Vec<KeyId>>;

    /// Mark bootstrap accounting as complete.
    fn initialized(&self) -> Result<()>;

    /// Returns `true` once [`initialized`](Self::initialized) has been called.
    fn is_initialized(&self) -> bool;

    /// Flush state to durable storage and refuse further mutation.
    fn close(&self) -> Result<()>;
}
