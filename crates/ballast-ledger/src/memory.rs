//! In-memory usage store for tests, local demos, and embedding.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use tracing::warn;

use ballast_types::{BlockId, KeyId};

use crate::error::{LedgerError, Result};
use crate::records::{UserUsage, WriterUsage};
use crate::traits::UsageStore;

/// An in-memory implementation of [`UsageStore`].
///
/// All records live behind one `RwLock`; the trait's atomicity guarantees
/// follow from every operation completing under a single lock acquisition.
#[derive(Default)]
pub struct InMemoryUsageStore {
    inner: RwLock<State>,
    initialized: AtomicBool,
    closed: AtomicBool,
}

#[derive(Default)]
struct State {
    users: HashMap<KeyId, UserUsage>,
    writers: HashMap<KeyId, WriterUsage>,
}

impl InMemoryUsageStore {
    /// Create a new empty usage store.
    pub fn new() -> Self {
        Self::default()
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(LedgerError::Closed);
        }
        self.inner
            .write()
            .map_err(|e| LedgerError::Serialization(format!("lock poisoned: {e}")))
    }

    fn read_state(&self) -> Result<std::sync::RwLockReadGuard<'_, State>> {
        self.inner
            .read()
            .map_err(|e| LedgerError::Serialization(format!("lock poisoned: {e}")))
    }
}

impl UsageStore for InMemoryUsageStore {
    fn add_user_if_absent(&self, owner: &KeyId) -> Result<()> {
        let mut state = self.write_state()?;
        state.users.entry(*owner).or_default();
        Ok(())
    }

    fn add_writer(&self, owner: &KeyId, writer: &KeyId) -> Result<()> {
        let mut state = self.write_state()?;
        state.users.entry(*owner).or_default();
        state
            .writers
            .entry(*writer)
            .or_insert_with(|| WriterUsage::new(*owner));
        Ok(())
    }

    fn set_writers(&self, owner: &KeyId, root: &KeyId, children: &BTreeSet<KeyId>) -> Result<()> {
        let mut state = self.write_state()?;
        state.users.entry(*owner).or_default();
        state
            .writers
            .entry(*root)
            .or_insert_with(|| WriterUsage::new(*owner));
        for child in children {
            state
                .writers
                .entry(*child)
                .or_insert_with(|| WriterUsage::new(*owner));
        }
        Ok(())
    }

    fn writer_usage(&self, writer: &KeyId) -> Result<Option<WriterUsage>> {
        Ok(self.read_state()?.writers.get(writer).cloned())
    }

    fn user_usage(&self, owner: &KeyId) -> Result<Option<UserUsage>> {
        Ok(self.read_state()?.users.get(owner).cloned())
    }

    fn confirm_usage(&self, owner: &KeyId, writer: &KeyId, delta: i64) -> Result<()> {
        let mut state = self.write_state()?;
        let user = state
            .users
            .get_mut(owner)
            .ok_or(LedgerError::UnknownUser(*owner))?;
        if delta >= 0 {
            user.total_usage += delta as u64;
        } else {
            let drop = delta.unsigned_abs();
            if drop > user.total_usage {
                warn!(
                    owner = %owner,
                    total = user.total_usage,
                    delta,
                    "usage delta underflows owner total; clamping to zero"
                );
                user.total_usage = 0;
            } else {
                user.total_usage -= drop;
            }
        }
        user.pending.remove(writer);
        Ok(())
    }

    fn update_writer_usage(
        &self,
        writer: &KeyId,
        target: Option<BlockId>,
        owned_keys: BTreeSet<KeyId>,
        direct_retained: u64,
    ) -> Result<()> {
        let mut state = self.write_state()?;
        let record = state
            .writers
            .get_mut(writer)
            .ok_or(LedgerError::UnknownWriter(*writer))?;
        record.target = target;
        record.owned_keys = owned_keys;
        record.direct_retained = direct_retained;
        Ok(())
    }

    fn add_pending_usage(&self, owner: &KeyId, writer: &KeyId, bytes: u64) -> Result<()> {
        let mut state = self.write_state()?;
        let user = state
            .users
            .get_mut(owner)
            .ok_or(LedgerError::UnknownUser(*owner))?;
        *user.pending.entry(*writer).or_insert(0) += bytes;
        Ok(())
    }

    fn clear_pending_usage(&self, owner: &KeyId, writer: &KeyId) -> Result<()> {
        let mut state = self.write_state()?;
        let user = state
            .users
            .get_mut(owner)
            .ok_or(LedgerError::UnknownUser(*owner))?;
        user.pending.remove(writer);
        Ok(())
    }

    fn set_errored(&self, owner: &KeyId, errored: bool) -> Result<()> {
        let mut state = self.write_state()?;
        let user = state
            .users
            .get_mut(owner)
            .ok_or(LedgerError::UnknownUser(*owner))?;
        user.errored = errored;
        Ok(())
    }

    fn all_writers(&self) -> Result<Vec<KeyId>> {
        Ok(self.read_state()?.writers.keys().copied().collect())
    }

    fn initialized(&self) -> Result<()> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn close(&self) -> Result<()> {
        // Nothing to flush for the in-memory backend; refuse further writes.
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> KeyId {
        KeyId::from_raw([byte; 32])
    }

    #[test]
    fn add_writer_registers_user_and_record() {
        let store = InMemoryUsageStore::new();
        store.add_writer(&key(1), &key(2)).unwrap();
        let record = store.writer_usage(&key(2)).unwrap().unwrap();
        assert_eq!(record.owner, key(1));
        assert!(store.user_usage(&key(1)).unwrap().is_some());
    }

    #[test]
    fn add_writer_keeps_first_owner() {
        let store = InMemoryUsageStore::new();
        store.add_writer(&key(1), &key(2)).unwrap();
        store.add_writer(&key(9), &key(2)).unwrap();
        let record = store.writer_usage(&key(2)).unwrap().unwrap();
        assert_eq!(record.owner, key(1));
    }

    #[test]
    fn set_writers_registers_children() {
        let store = InMemoryUsageStore::new();
        let children: BTreeSet<KeyId> = [key(2), key(3)].into_iter().collect();
        store.set_writers(&key(1), &key(1), &children).unwrap();
        assert!(store.writer_usage(&key(1)).unwrap().is_some());
        assert_eq!(store.writer_usage(&key(2)).unwrap().unwrap().owner, key(1));
        assert_eq!(store.writer_usage(&key(3)).unwrap().unwrap().owner, key(1));
    }

    #[test]
    fn confirm_usage_applies_delta_and_clears_pending() {
        let store = InMemoryUsageStore::new();
        store.add_writer(&key(1), &key(2)).unwrap();
        store.add_pending_usage(&key(1), &key(2), 500).unwrap();
        store.confirm_usage(&key(1), &key(2), 500).unwrap();
        let user = store.user_usage(&key(1)).unwrap().unwrap();
        assert_eq!(user.total_usage, 500);
        assert!(user.pending.is_empty());
    }

    #[test]
    fn confirm_usage_clamps_at_zero() {
        let store = InMemoryUsageStore::new();
        store.add_writer(&key(1), &key(2)).unwrap();
        store.confirm_usage(&key(1), &key(2), 100).unwrap();
        store.confirm_usage(&key(1), &key(2), -500).unwrap();
        assert_eq!(store.user_usage(&key(1)).unwrap().unwrap().total_usage, 0);
    }

    #[test]
    fn confirm_usage_unknown_user_errors() {
        let store = InMemoryUsageStore::new();
        let err = store.confirm_usage(&key(1), &key(2), 10).unwrap_err();
        assert_eq!(err, LedgerError::UnknownUser(key(1)));
    }

    #[test]
    fn pending_accumulates_until_cleared() {
        let store = InMemoryUsageStore::new();
        store.add_writer(&key(1), &key(2)).unwrap();
        store.add_pending_usage(&key(1), &key(2), 100).unwrap();
        store.add_pending_usage(&key(1), &key(2), 200).unwrap();
        let user = store.user_usage(&key(1)).unwrap().unwrap();
        assert_eq!(user.pending_of(&key(2)), 300);
        assert_eq!(user.expected_usage(), 300);

        store.clear_pending_usage(&key(1), &key(2)).unwrap();
        let user = store.user_usage(&key(1)).unwrap().unwrap();
        assert_eq!(user.expected_usage(), 0);
    }

    #[test]
    fn errored_flag_is_sticky_until_reset() {
        let store = InMemoryUsageStore::new();
        store.add_user_if_absent(&key(1)).unwrap();
        store.set_errored(&key(1), true).unwrap();
        assert!(store.user_usage(&key(1)).unwrap().unwrap().errored);
        store.set_errored(&key(1), false).unwrap();
        assert!(!store.user_usage(&key(1)).unwrap().unwrap().errored);
    }

    #[test]
    fn update_writer_usage_unknown_writer_errors() {
        let store = InMemoryUsageStore::new();
        let err = store
            .update_writer_usage(&key(5), None, BTreeSet::new(), 0)
            .unwrap_err();
        assert_eq!(err, LedgerError::UnknownWriter(key(5)));
    }

    #[test]
    fn all_writers_lists_registered_keys() {
        let store = InMemoryUsageStore::new();
        store.add_writer(&key(1), &key(1)).unwrap();
        store.add_writer(&key(1), &key(2)).unwrap();
        let mut writers = store.all_writers().unwrap();
        writers.sort();
        assert_eq!(writers, vec![key(1), key(2)]);
    }

    #[test]
    fn close_refuses_further_mutation() {
        let store = InMemoryUsageStore::new();
        store.add_user_if_absent(&key(1)).unwrap();
        store.close().unwrap();
        let err = store.add_user_if_absent(&key(2)).unwrap_err();
        assert_eq!(err, LedgerError::Closed);
        // Reads still work after close.
        assert!(store.user_usage(&key(1)).unwrap().is_some());
    }

    #[test]
    fn initialized_flag() {
        let store = InMemoryUsageStore::new();
        assert!(!store.is_initialized());
        store.initialized().unwrap();
        assert!(store.is_initialized());
    }
}
