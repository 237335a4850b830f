//! In-memory pointer store for testing and ephemeral use.
//!
//! [`InMemoryPointerStore`] keeps all pointers in a `HashMap` protected by a
//! `RwLock` and resolves writer signing keys through a shared
//! [`BlockStore`]. Data is lost when the store is dropped.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use ballast_crypto::envelope;
use ballast_store::BlockStore;
use ballast_types::{BlockId, CasPair, KeyId};

use crate::error::{RefError, Result};
use crate::traits::PointerStore;

/// An in-memory implementation of [`PointerStore`].
///
/// Targets are keyed by writer alone: a writer key controls exactly one
/// pointer regardless of which owner namespace it is queried through, so the
/// `owner` argument only rides along for the trait contract.
pub struct InMemoryPointerStore {
    keys: Arc<dyn BlockStore>,
    targets: RwLock<HashMap<KeyId, BlockId>>,
}

impl InMemoryPointerStore {
    /// Create an empty pointer store resolving keys through `keys`.
    pub fn new(keys: Arc<dyn BlockStore>) -> Self {
        Self {
            keys,
            targets: RwLock::new(HashMap::new()),
        }
    }

    /// Verify and decode a sealed CAS payload for `writer`.
    pub fn open_cas(&self, writer: &KeyId, signed_cas: &[u8]) -> Result<CasPair> {
        let key = self
            .keys
            .resolve_signing_key(writer)?
            .ok_or(RefError::UnknownKey(*writer))?;
        let payload = envelope::open(&key, signed_cas)
            .map_err(|_| RefError::Unauthorized(*writer))?;
        bincode::deserialize(&payload).map_err(|_| RefError::MalformedPayload(*writer))
    }
}

impl PointerStore for InMemoryPointerStore {
    fn get_target(&self, _owner: &KeyId, writer: &KeyId) -> Result<Option<BlockId>> {
        let targets = self
            .targets
            .read()
            .map_err(|e| RefError::Serialization(format!("lock poisoned: {e}")))?;
        Ok(targets.get(writer).copied())
    }

    fn cas_set(&self, _owner: &KeyId, writer: &KeyId, signed_cas: &[u8]) -> Result<()> {
        let pair = self.open_cas(writer, signed_cas)?;

        let mut targets = self
            .targets
            .write()
            .map_err(|e| RefError::Serialization(format!("lock poisoned: {e}")))?;
        let slot = *writer;
        let current = targets.get(&slot).copied();
        if current != pair.original {
            return Err(RefError::CasConflict {
                writer: *writer,
                expected: pair.original,
                found: current,
            });
        }
        match pair.updated {
            Some(updated) => {
                targets.insert(slot, updated);
            }
            None => {
                targets.remove(&slot);
            }
        }
        debug!(writer = %writer, from = ?pair.original, to = ?pair.updated, "pointer moved");
        Ok(())
    }
}
