//! The engine facade.
//!
//! [`SpaceManager`] owns the event queue, the worker task draining it, and
//! the shutdown signal. Construction spawns the worker;
//! [`SpaceManager::shutdown`] stops it, joins it, and flushes the ledger.
//! The engine's lifecycle is entirely explicit, no global hooks.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use ballast_ledger::UsageStore;
use ballast_refs::PointerStore;
use ballast_store::BlockStore;
use ballast_types::{IdentityEvent, KeyId, PointerEvent};

use crate::config::SpaceConfig;
use crate::directory::{IdentityDirectory, QuotaSource};
use crate::error::Result;
use crate::processor::EngineState;
use crate::requests::RequestStore;
use crate::sweep;

/// The usage-accounting and quota-enforcement engine.
///
/// Pointer-change notifications arrive on a bounded queue and are applied by
/// a single worker, so live ledger mutations are strictly serialized
/// relative to each other. Identity events and sweeps run on the caller's
/// context and may fan out per subtree; both paths share the same
/// per-writer locking underneath.
pub struct SpaceManager {
    state: Arc<EngineState>,
    events: mpsc::Sender<PointerEvent>,
    shutdown: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SpaceManager {
    /// Construct the engine and spawn its event worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        blocks: Arc<dyn BlockStore>,
        pointers: Arc<dyn PointerStore>,
        usage: Arc<dyn UsageStore>,
        directory: Arc<dyn IdentityDirectory>,
        quotas: Arc<dyn QuotaSource>,
        requests: Arc<dyn RequestStore>,
        config: SpaceConfig,
    ) -> Self {
        let queue_capacity = config.queue_capacity;
        let state = Arc::new(EngineState::new(
            blocks, pointers, usage, directory, quotas, requests, config,
        ));

        let (events, mut queue) = mpsc::channel::<PointerEvent>(queue_capacity);
        let (shutdown, mut stop) = watch::channel(false);
        let worker_state = state.clone();
        let worker = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop.changed() => break,
                    event = queue.recv() => match event {
                        Some(event) => {
                            if let Err(err) = worker_state.apply_pointer_event(&event) {
                                warn!(writer = %event.writer, error = %err,
                                    "dropping pointer event");
                            }
                        }
                        None => break,
                    },
                }
            }
            info!("event worker stopped");
        });

        Self {
            state,
            events,
            shutdown,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Bootstrap: account every local user's ownership tree and mark the
    /// ledger initialized.
    pub async fn calculate_usage(&self) -> Result<()> {
        sweep::calculate_usage(self.state.clone()).await
    }

    /// Drift correction: re-poll every known writer's pointer and fold in
    /// whatever the event path missed.
    pub fn refresh_usage(&self) -> Result<()> {
        self.state.refresh_usage()
    }

    /// A username registered or rotated its identity key: register the key
    /// and account its whole tree synchronously.
    pub fn accept_identity_event(&self, event: &IdentityEvent) -> Result<()> {
        self.state.usage.add_user_if_absent(&event.key)?;
        self.state.usage.add_writer(&event.key, &event.key)?;
        self.state.process_identity(&event.username, &event.key)
    }

    /// A writer's pointer may have changed: enqueue the notification.
    ///
    /// Delivery is best-effort. When the queue is full the event is dropped
    /// with a warning — the reconciliation sweep exists to heal exactly
    /// this. Keys granted by the new root are registered eagerly so that
    /// admission checks on them do not race the queue.
    pub fn accept_mutable_event(&self, event: PointerEvent) {
        if let Err(err) = self.state.register_granted_keys(&event) {
            warn!(writer = %event.writer, error = %err,
                "failed registering granted keys for event");
        }
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(writer = %event.writer, "event queue full; dropping notification");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                warn!(writer = %event.writer, "event worker stopped; dropping notification");
            }
        }
    }

    /// The confirmed usage total billed to the owner of `key`.
    pub fn get_usage(&self, key: &KeyId) -> Result<u64> {
        self.state.usage_of(key)
    }

    /// The quota of the owner of `key`, gated on a fresh signed time proof.
    pub fn get_quota(&self, key: &KeyId, signed_proof: &[u8]) -> Result<u64> {
        self.state.quota_of(key, signed_proof)
    }

    /// Verify a signed quota-increase request and park it for approval.
    pub fn request_space(&self, owner: &KeyId, signed_request: &[u8]) -> Result<()> {
        self.state.request_space(owner, signed_request)
    }

    /// Quota-gate a write of `bytes` by `writer`, reserving them on success.
    pub fn allow_write(&self, writer: &KeyId, bytes: u64) -> Result<()> {
        self.state.allow_write(writer, bytes)
    }

    /// Stop the worker, join it, and flush the ledger.
    ///
    /// Events still queued are not drained; the next bootstrap sweep
    /// re-derives their effects from the pointer layer.
    pub async fn shutdown(&self) -> Result<()> {
        let _ = self.shutdown.send(true);
        let handle = self.worker.lock().expect("worker handle poisoned").take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(error = %err, "event worker panicked");
            }
        }
        self.state.usage.close()?;
        info!("space manager shut down");
        Ok(())
    }
}
