//! Ownership tree walker.

use std::collections::{BTreeSet, HashSet};

use ballast_store::{BlockStore, StoreResult};
use ballast_types::{BlockId, KeyId};

/// The writer keys `writer` directly delegates to from `root`.
///
/// Walks every block reachable from `root` and collects the keys named in
/// their grant lists, excluding `writer` itself. A pure function of the root
/// hash: the same root always yields the same set.
pub fn direct_owned_keys(
    store: &dyn BlockStore,
    writer: &KeyId,
    root: &BlockId,
) -> StoreResult<BTreeSet<KeyId>> {
    let mut owned = BTreeSet::new();
    let mut visited = HashSet::new();
    let mut stack = vec![*root];
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let block = store
            .read(&id)?
            .ok_or(ballast_store::StoreError::NotFound(id))?;
        owned.extend(block.grants.iter().filter(|k| *k != writer).copied());
        stack.extend(block.links.iter().copied());
    }
    Ok(owned)
}
