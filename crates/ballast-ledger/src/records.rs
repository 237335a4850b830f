use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use ballast_types::{BlockId, KeyId};

/// Per-writer accounting record.
///
/// `direct_retained` counts the bytes of this writer's own subtree only;
/// subtrees of delegated children are billed to their own records. The sum
/// over an owner's whole tree lives in [`UserUsage::total_usage`] and is
/// maintained incrementally — the two must never be reconciled by traversal
/// during normal operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterUsage {
    /// The billing identity this writer's usage is attributed to.
    pub owner: KeyId,
    /// Current pointer target, if any.
    pub target: Option<BlockId>,
    /// Bytes attributable to this writer's own subtree.
    pub direct_retained: u64,
    /// Writer keys this writer directly delegates to.
    pub owned_keys: BTreeSet<KeyId>,
}

impl WriterUsage {
    /// A freshly registered writer: empty pointer, nothing retained.
    pub fn new(owner: KeyId) -> Self {
        Self {
            owner,
            target: None,
            direct_retained: 0,
            owned_keys: BTreeSet::new(),
        }
    }
}

/// Per-owner aggregate record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUsage {
    /// Sum of `direct_retained` across every writer billed to this owner.
    pub total_usage: u64,
    /// Bytes reserved for in-flight writes, keyed by the reserving writer.
    pub pending: HashMap<KeyId, u64>,
    /// Sticky flag set when a write has been rejected for this owner.
    pub errored: bool,
}

impl UserUsage {
    /// Confirmed usage plus all outstanding reservations.
    pub fn expected_usage(&self) -> u64 {
        self.total_usage + self.pending.values().sum::<u64>()
    }

    /// The reservation currently held by `writer`, or zero.
    pub fn pending_of(&self, writer: &KeyId) -> u64 {
        self.pending.get(writer).copied().unwrap_or(0)
    }
}
