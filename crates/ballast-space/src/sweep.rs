//! Reconciliation sweeps.
//!
//! Two batch passes share the event processor's delta logic: a bootstrap
//! sweep that establishes a baseline for every local user at startup, and a
//! drift-correction pass that re-polls every known writer's pointer. Both
//! exist because event delivery is best-effort — the bounded queue drops
//! notifications under pressure, and this is the path that heals the gap.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use ballast_types::KeyId;

use crate::error::Result;
use crate::processor::EngineState;

/// Bootstrap accounting for every local username.
///
/// Users are processed concurrently, at most `sweep_concurrency` at a time,
/// and the pass completes only when every task has joined. A failure for one
/// user is logged and never aborts the rest. Marks the ledger initialized
/// when done.
pub(crate) async fn calculate_usage(state: Arc<EngineState>) -> Result<()> {
    let usernames = state.directory.local_usernames()?;
    info!(users = usernames.len(), "calculating storage usage for local users");

    let permits = Arc::new(Semaphore::new(state.config.sweep_concurrency));
    let mut tasks = JoinSet::new();
    for username in usernames {
        let state = state.clone();
        let permits = permits.clone();
        tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .expect("sweep semaphore closed");
            match state.directory.resolve_identity(&username) {
                Ok(Some(identity)) => {
                    if let Err(err) = state.process_identity(&username, &identity) {
                        warn!(user = %username, error = %err, "failed calculating usage");
                    } else if let Ok(Some(usage)) = state.usage.user_usage(&identity) {
                        info!(user = %username, usage = usage.total_usage, "usage calculated");
                    }
                }
                Ok(None) => info!(user = %username, "identity absent in directory"),
                Err(err) => warn!(user = %username, error = %err, "failed resolving identity"),
            }
        });
    }
    while tasks.join_next().await.is_some() {}

    state.usage.initialized()?;
    info!("finished calculating storage usage for local users");
    Ok(())
}

impl EngineState {
    /// Re-poll every known writer and fold in any pointer moves the event
    /// path missed. Per-writer failures are logged and skipped.
    pub(crate) fn refresh_usage(&self) -> Result<()> {
        info!("checking for updated pointers");
        for writer in self.usage.all_writers()? {
            if let Err(err) = self.refresh_writer(&writer) {
                warn!(writer = %writer, error = %err, "failed refreshing writer usage");
            }
        }
        info!("finished checking for updated pointers");
        Ok(())
    }

    fn refresh_writer(&self, writer: &KeyId) -> Result<()> {
        let record = self
            .usage
            .writer_usage(writer)?
            .ok_or(crate::error::SpaceError::UnknownWriter(*writer))?;
        let target = self.pointers.get_target(&record.owner, writer)?;
        if target == record.target {
            return Ok(());
        }
        info!(writer = %writer, from = ?record.target, to = ?target, "pointer changed since last event");

        let known_before = record.owned_keys;
        self.process_change(writer, target)?;

        // Keys granted while events were being missed have never been
        // accounted at all; walk their subtrees now.
        let after = self
            .usage
            .writer_usage(writer)?
            .ok_or(crate::error::SpaceError::UnknownWriter(*writer))?;
        for key in after.owned_keys.difference(&known_before) {
            if let Err(err) = self.process_subtree(&record.owner, key) {
                warn!(writer = %key, error = %err, "failed accounting newly discovered writer");
            }
        }
        Ok(())
    }
}
