//! The pointer-event processor.
//!
//! Every accepted pointer change for a writer flows through
//! [`EngineState::process_change`]: compute the storage delta against the
//! recorded target, register newly granted keys, apply the delta to the
//! owner's aggregate, and reclaim subtrees whose grants disappeared. The
//! whole mutation for one writer runs under that writer's exclusive lock;
//! owner aggregates move by single atomic deltas so writers sharing an owner
//! never contend on each other's locks.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use ballast_crypto::envelope;
use ballast_ledger::UsageStore;
use ballast_refs::PointerStore;
use ballast_store::BlockStore;
use ballast_types::{BlockId, CasPair, KeyId, PointerEvent};

use crate::config::SpaceConfig;
use crate::directory::{IdentityDirectory, QuotaSource};
use crate::error::{Result, SpaceError};
use crate::requests::RequestStore;
use crate::walker::direct_owned_keys;

/// Shared state behind the engine: collaborator handles, configuration, and
/// the per-writer lock table.
pub(crate) struct EngineState {
    pub blocks: Arc<dyn BlockStore>,
    pub pointers: Arc<dyn PointerStore>,
    pub usage: Arc<dyn UsageStore>,
    pub directory: Arc<dyn IdentityDirectory>,
    pub quotas: Arc<dyn QuotaSource>,
    pub requests: Arc<dyn RequestStore>,
    pub config: SpaceConfig,
    locks: Mutex<HashMap<KeyId, Arc<Mutex<()>>>>,
}

impl EngineState {
    pub(crate) fn new(
        blocks: Arc<dyn BlockStore>,
        pointers: Arc<dyn PointerStore>,
        usage: Arc<dyn UsageStore>,
        directory: Arc<dyn IdentityDirectory>,
        quotas: Arc<dyn QuotaSource>,
        requests: Arc<dyn RequestStore>,
        config: SpaceConfig,
    ) -> Self {
        Self {
            blocks,
            pointers,
            usage,
            directory,
            quotas,
            requests,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The exclusive lock serializing mutations of one writer's record.
    fn writer_lock(&self, writer: &KeyId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock table poisoned");
        locks
            .entry(*writer)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Verify and decode the signed CAS payload carried by `event`.
    ///
    /// This is the trust boundary: nothing downstream ever sees an
    /// unverified pair.
    pub(crate) fn decode_event(&self, event: &PointerEvent) -> Result<CasPair> {
        let key = self
            .blocks
            .resolve_signing_key(&event.writer)?
            .ok_or(SpaceError::Auth(event.writer))?;
        let payload = envelope::open(&key, &event.signed_cas)
            .map_err(|_| SpaceError::Auth(event.writer))?;
        bincode::deserialize(&payload).map_err(|_| SpaceError::Auth(event.writer))
    }

    /// Apply an externally delivered pointer event.
    ///
    /// Redelivery of an already-applied pair is a no-op; a pair whose signed
    /// `original` disagrees with the recorded target is rejected without any
    /// state change. The check runs under the writer's lock, so a concurrent
    /// sweep correction cannot slip between check and apply.
    pub(crate) fn apply_pointer_event(&self, event: &PointerEvent) -> Result<()> {
        let pair = self.decode_event(event)?;
        self.process_change_inner(&event.writer, pair.updated, Some(pair.original))
    }

    /// Eagerly register the keys granted by an event's new root, so that
    /// admission checks on a freshly delegated writer do not race the event
    /// queue.
    pub(crate) fn register_granted_keys(&self, event: &PointerEvent) -> Result<()> {
        let pair = self.decode_event(event)?;
        let Some(root) = pair.updated else {
            return Ok(());
        };
        let record = self
            .usage
            .writer_usage(&event.writer)?
            .ok_or(SpaceError::UnknownWriter(event.writer))?;
        for key in direct_owned_keys(self.blocks.as_ref(), &event.writer, &root)? {
            self.usage.add_writer(&record.owner, &key)?;
        }
        Ok(())
    }

    /// Move a writer's accounting to `new_root` and bill the difference.
    ///
    /// `new_root: None` reclaims the writer entirely: its retained bytes are
    /// subtracted from the owner total and every previously granted child is
    /// reclaimed recursively. Ownership keys are assumed to form a
    /// duplicate-free forest; a child shared between two parents would be
    /// reclaimed twice.
    pub(crate) fn process_change(&self, writer: &KeyId, new_root: Option<BlockId>) -> Result<()> {
        self.process_change_inner(writer, new_root, None)
    }

    /// The locked body of [`Self::process_change`]. When `expected` is
    /// given, the swap is applied only if the recorded target still matches
    /// it (the CAS guard for externally signed pairs); internal cascades and
    /// sweeps pass `None` and trust the recorded state.
    fn process_change_inner(
        &self,
        writer: &KeyId,
        new_root: Option<BlockId>,
        expected: Option<Option<BlockId>>,
    ) -> Result<()> {
        let lock = self.writer_lock(writer);
        let billed_owner;
        let removed_children: BTreeSet<KeyId>;
        {
            let _guard = lock.lock().expect("writer lock poisoned");
            let record = self
                .usage
                .writer_usage(writer)?
                .ok_or(SpaceError::UnknownWriter(*writer))?;
            billed_owner = record.owner;
            if record.target == new_root {
                debug!(writer = %writer, "pointer change already applied");
                return Ok(());
            }
            if let Some(expected) = expected {
                if expected != record.target {
                    return Err(SpaceError::CasConflict {
                        writer: *writer,
                        signed: expected,
                        recorded: record.target,
                    });
                }
            }
            match new_root {
                None => {
                    if record.direct_retained > 0 {
                        self.usage.confirm_usage(
                            &record.owner,
                            writer,
                            -(record.direct_retained as i64),
                        )?;
                    }
                    self.usage
                        .update_writer_usage(writer, None, BTreeSet::new(), 0)?;
                    removed_children = record.owned_keys;
                    debug!(writer = %writer, "writer reclaimed");
                }
                Some(root) => {
                    let delta = self.blocks.size_delta(record.target.as_ref(), Some(&root))?;
                    let owned = direct_owned_keys(self.blocks.as_ref(), writer, &root)?;
                    for key in &owned {
                        self.usage.add_writer(&record.owner, key)?;
                    }
                    self.usage.confirm_usage(&record.owner, writer, delta)?;
                    let retained = (record.direct_retained as i64 + delta).max(0) as u64;
                    removed_children =
                        record.owned_keys.difference(&owned).copied().collect();
                    self.usage
                        .update_writer_usage(writer, Some(root), owned, retained)?;
                    debug!(writer = %writer, delta, retained, "writer usage updated");
                }
            }
        }
        // The parent's lock is released before descending; child reclamation
        // takes each child's own lock. One child failing must not abort its
        // siblings.
        for child in &removed_children {
            if let Err(err) = self.process_change(child, None) {
                warn!(owner = %billed_owner, child = %child, error = %err,
                    "failed reclaiming orphaned writer");
            }
        }
        Ok(())
    }

    /// Register a user identity and account its whole ownership tree.
    ///
    /// Used on sign-up, key rotation, and bootstrap.
    pub(crate) fn process_identity(&self, username: &str, identity: &KeyId) -> Result<()> {
        debug!(user = %username, identity = %identity, "accounting identity tree");
        self.usage.add_user_if_absent(identity)?;
        self.usage.add_writer(identity, identity)?;
        self.process_subtree(identity, identity)
    }

    /// Account `writer`'s current pointer target and recurse into every key
    /// it delegates to. Per-child failures are logged and skipped.
    pub(crate) fn process_subtree(&self, owner: &KeyId, writer: &KeyId) -> Result<()> {
        let target = self.pointers.get_target(owner, writer)?;
        let children = match &target {
            Some(root) => direct_owned_keys(self.blocks.as_ref(), writer, root)?,
            None => BTreeSet::new(),
        };
        self.usage.set_writers(owner, writer, &children)?;
        self.process_change(writer, target)?;
        for child in &children {
            if let Err(err) = self.process_subtree(owner, child) {
                warn!(owner = %owner, child = %child, error = %err,
                    "failed accounting delegated subtree");
            }
        }
        Ok(())
    }
}
