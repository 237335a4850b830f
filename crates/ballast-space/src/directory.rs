//! Identity and quota collaborators.
//!
//! The engine resolves usernames to identity keys through an
//! [`IdentityDirectory`] and per-owner byte quotas through a [`QuotaSource`].
//! Both ship with in-memory implementations for tests and embedded use.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use ballast_types::KeyId;

use crate::error::{Result, SpaceError};

/// Username-to-identity mapping, as maintained by the network's naming
/// service.
pub trait IdentityDirectory: Send + Sync {
    /// The current root identity key for `username`, if registered.
    fn resolve_identity(&self, username: &str) -> Result<Option<KeyId>>;

    /// Usernames homed on this server, used to bootstrap accounting.
    fn local_usernames(&self) -> Result<Vec<String>>;
}

/// Supplier of per-owner storage quotas.
pub trait QuotaSource: Send + Sync {
    /// The byte quota granted to `owner`.
    fn quota(&self, owner: &KeyId) -> Result<u64>;
}

/// An in-memory implementation of [`IdentityDirectory`].
#[derive(Default)]
pub struct InMemoryDirectory {
    identities: RwLock<BTreeMap<String, KeyId>>,
}

impl InMemoryDirectory {
    /// Create a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or rotate) the identity key for `username`.
    pub fn register(&self, username: impl Into<String>, key: KeyId) {
        self.identities
            .write()
            .expect("directory lock poisoned")
            .insert(username.into(), key);
    }
}

impl IdentityDirectory for InMemoryDirectory {
    fn resolve_identity(&self, username: &str) -> Result<Option<KeyId>> {
        let identities = self
            .identities
            .read()
            .map_err(|e| SpaceError::Directory(format!("lock poisoned: {e}")))?;
        Ok(identities.get(username).copied())
    }

    fn local_usernames(&self) -> Result<Vec<String>> {
        let identities = self
            .identities
            .read()
            .map_err(|e| SpaceError::Directory(format!("lock poisoned: {e}")))?;
        Ok(identities.keys().cloned().collect())
    }
}

/// An in-memory implementation of [`QuotaSource`]: a default quota with
/// per-owner overrides.
pub struct InMemoryQuotas {
    default_quota: u64,
    overrides: RwLock<HashMap<KeyId, u64>>,
}

impl InMemoryQuotas {
    /// Create a quota source granting `default_quota` bytes to every owner.
    pub fn new(default_quota: u64) -> Self {
        Self {
            default_quota,
            overrides: RwLock::new(HashMap::new()),
        }
    }

    /// Override the quota for a single owner.
    pub fn set_quota(&self, owner: KeyId, quota: u64) {
        self.overrides
            .write()
            .expect("quota lock poisoned")
            .insert(owner, quota);
    }
}

impl QuotaSource for InMemoryQuotas {
    fn quota(&self, owner: &KeyId) -> Result<u64> {
        let overrides = self
            .overrides
            .read()
            .map_err(|e| SpaceError::Directory(format!("lock poisoned: {e}")))?;
        Ok(overrides.get(owner).copied().unwrap_or(self.default_quota))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> KeyId {
        KeyId::from_raw([byte; 32])
    }

    #[test]
    fn directory_resolves_registered_names() {
        let directory = InMemoryDirectory::new();
        directory.register("alice", key(1));
        assert_eq!(directory.resolve_identity("alice").unwrap(), Some(key(1)));
        assert_eq!(directory.resolve_identity("bob").unwrap(), None);
    }

    #[test]
    fn key_rotation_replaces_identity() {
        let directory = InMemoryDirectory::new();
        directory.register("alice", key(1));
        directory.register("alice", key(2));
        assert_eq!(directory.resolve_identity("alice").unwrap(), Some(key(2)));
    }

    #[test]
    fn local_usernames_are_sorted() {
        let directory = InMemoryDirectory::new();
        directory.register("carol", key(1));
        directory.register("alice", key(2));
        assert_eq!(directory.local_usernames().unwrap(), vec!["alice", "carol"]);
    }

    #[test]
    fn quota_overrides_fall_back_to_default() {
        let quotas = InMemoryQuotas::new(1000);
        quotas.set_quota(key(1), 5000);
        assert_eq!(quotas.quota(&key(1)).unwrap(), 5000);
        assert_eq!(quotas.quota(&key(2)).unwrap(), 1000);
    }
}
