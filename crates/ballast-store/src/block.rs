use serde::{Deserialize, Serialize};

use ballast_types::{BlockId, KeyId};

use crate::error::{StoreError, StoreResult};

/// The unit of content-addressed storage.
///
/// A block carries its own payload length, positional links to child blocks
/// within the same writer's subtree, and the writer keys it grants (delegates
/// write access to). Links are positional: diffing two versions of a block
/// compares children index by index, so an unchanged child keeps its slot and
/// its whole subtree is skipped by hash equality.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Payload bytes attributed to this block itself (excluding children).
    pub data_len: u64,
    /// Child blocks in this writer's subtree, in slot order.
    pub links: Vec<BlockId>,
    /// Writer keys this block delegates write access to.
    pub grants: Vec<KeyId>,
}

impl Block {
    /// A leaf block holding `data_len` payload bytes.
    pub fn leaf(data_len: u64) -> Self {
        Self {
            data_len,
            links: Vec::new(),
            grants: Vec::new(),
        }
    }

    /// An interior block with payload, children, and delegated keys.
    pub fn new(data_len: u64, links: Vec<BlockId>, grants: Vec<KeyId>) -> Self {
        Self {
            data_len,
            links,
            grants,
        }
    }

    /// Serialize for storage and hashing.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Decode from stored bytes.
    pub fn decode(bytes: &[u8]) -> StoreResult<Self> {
        bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Compute the content-addressed ID for this block.
    pub fn compute_id(&self) -> StoreResult<BlockId> {
        Ok(BlockId::derive(&self.encode()?))
    }
}
