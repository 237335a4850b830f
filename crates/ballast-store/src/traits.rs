use std::collections::HashSet;

use ballast_crypto::VerifyingKey;
use ballast_types::{BlockId, KeyId};

use crate::block::Block;
use crate::error::{StoreError, StoreResult};

/// Content-addressed block store.
///
/// All implementations must satisfy these invariants:
/// - Blocks are immutable once written; the same block always produces the
///   same ID.
/// - Concurrent reads are always safe.
/// - All I/O errors are propagated, never silently ignored.
/// - Registered signing keys are append-only: a `KeyId` always resolves to
///   the same public key.
pub trait BlockStore: Send + Sync {
    /// Read a block by its content-addressed ID.
    ///
    /// Returns `Ok(None)` if the block does not exist.
    fn read(&self, id: &BlockId) -> StoreResult<Option<Block>>;

    /// Write a block and return its content-addressed ID.
    ///
    /// If the block already exists, this is a no-op (idempotent).
    fn write(&self, block: &Block) -> StoreResult<BlockId>;

    /// Check whether a block exists in the store.
    fn has(&self, id: &BlockId) -> StoreResult<bool>;

    /// Resolve a registered public signing key by its hash.
    ///
    /// Returns `Ok(None)` if no key with this id has been registered.
    fn resolve_signing_key(&self, key: &KeyId) -> StoreResult<Option<VerifyingKey>>;

    /// Register a public signing key, returning its [`KeyId`].
    ///
    /// Idempotent: registering the same key twice returns the same id.
    fn register_signing_key(&self, key: &VerifyingKey) -> StoreResult<KeyId>;

    /// Total payload bytes reachable from `root`, counting each block once.
    ///
    /// Default implementation walks the link graph with a visited set.
    /// Backends with size indices may override.
    fn subtree_size(&self, root: &BlockId) -> StoreResult<u64> {
        let mut total = 0u64;
        let mut visited = HashSet::new();
        let mut stack = vec![*root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let block = self.read(&id)?.ok_or(StoreError::NotFound(id))?;
            total += block.data_len;
            stack.extend(block.links.iter().copied());
        }
        Ok(total)
    }

    /// Signed change in reachable payload bytes between two roots.
    ///
    /// Walks the two trees in parallel, comparing link slots index by index;
    /// slots whose block IDs match are skipped without descending, so the
    /// cost is proportional to the structural delta rather than the full
    /// tree. `None` on either side denotes an empty tree.
    fn size_delta(&self, old: Option<&BlockId>, new: Option<&BlockId>) -> StoreResult<i64> {
        let mut delta = 0i64;
        let mut stack: Vec<(Option<BlockId>, Option<BlockId>)> =
            vec![(old.copied(), new.copied())];
        while let Some(pair) = stack.pop() {
            match pair {
                (None, None) => {}
                (Some(o), Some(n)) => {
                    if o == n {
                        continue;
                    }
                    let old_block = self.read(&o)?.ok_or(StoreError::NotFound(o))?;
                    let new_block = self.read(&n)?.ok_or(StoreError::NotFound(n))?;
                    delta += new_block.data_len as i64 - old_block.data_len as i64;
                    let slots = old_block.links.len().max(new_block.links.len());
                    for i in 0..slots {
                        stack.push((
                            old_block.links.get(i).copied(),
                            new_block.links.get(i).copied(),
                        ));
                    }
                }
                (None, Some(n)) => delta += self.subtree_size(&n)? as i64,
                (Some(o), None) => delta -= self.subtree_size(&o)? as i64,
            }
        }
        Ok(delta)
    }
}
