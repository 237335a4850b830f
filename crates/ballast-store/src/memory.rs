//! In-memory block store for testing and embedded use.
//!
//! [`InMemoryBlockStore`] keeps blocks and registered signing keys in
//! `HashMap`s behind `RwLock`s. Data is lost when the store is dropped.

use std::collections::HashMap;
use std::sync::RwLock;

use ballast_crypto::VerifyingKey;
use ballast_types::{BlockId, KeyId};

use crate::block::Block;
use crate::error::{StoreError, StoreResult};
use crate::traits::BlockStore;

/// An in-memory implementation of [`BlockStore`].
#[derive(Default)]
pub struct InMemoryBlockStore {
    blocks: RwLock<HashMap<BlockId, Block>>,
    keys: RwLock<HashMap<KeyId, VerifyingKey>>,
}

impl InMemoryBlockStore {
    /// Create a new empty block store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks currently stored.
    pub fn block_count(&self) -> usize {
        self.blocks
            .read()
            .expect("block store lock poisoned")
            .len()
    }
}

impl BlockStore for InMemoryBlockStore {
    fn read(&self, id: &BlockId) -> StoreResult<Option<Block>> {
        let blocks = self
            .blocks
            .read()
            .map_err(|e| StoreError::Serialization(format!("lock poisoned: {e}")))?;
        Ok(blocks.get(id).cloned())
    }

    fn write(&self, block: &Block) -> StoreResult<BlockId> {
        let id = block.compute_id()?;
        let mut blocks = self
            .blocks
            .write()
            .map_err(|e| StoreError::Serialization(format!("lock poisoned: {e}")))?;
        blocks.entry(id).or_insert_with(|| block.clone());
        Ok(id)
    }

    fn has(&self, id: &BlockId) -> StoreResult<bool> {
        let blocks = self
            .blocks
            .read()
            .map_err(|e| StoreError::Serialization(format!("lock poisoned: {e}")))?;
        Ok(blocks.contains_key(id))
    }

    fn resolve_signing_key(&self, key: &KeyId) -> StoreResult<Option<VerifyingKey>> {
        let keys = self
            .keys
            .read()
            .map_err(|e| StoreError::Serialization(format!("lock poisoned: {e}")))?;
        Ok(keys.get(key).cloned())
    }

    fn register_signing_key(&self, key: &VerifyingKey) -> StoreResult<KeyId> {
        let id = key.key_id();
        let mut keys = self
            .keys
            .write()
            .map_err(|e| StoreError::Serialization(format!("lock poisoned: {e}")))?;
        keys.entry(id).or_insert_with(|| key.clone());
        Ok(id)
    }
}
