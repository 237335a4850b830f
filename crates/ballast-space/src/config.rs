use serde::{Deserialize, Serialize};

/// Configuration for the space accounting engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpaceConfig {
    /// Slack above the quota granted to owners already in the errored state.
    ///
    /// Without this band a user marginally over quota could never write
    /// again, not even the metadata updates needed to delete files or
    /// request more space.
    pub usage_tolerance: u64,
    /// Maximum age of a signed space request before it is rejected as a
    /// replay (milliseconds).
    pub request_window_millis: u64,
    /// Maximum age of a signed time proof accepted for quota reads
    /// (milliseconds).
    pub proof_window_millis: u64,
    /// Capacity of the bounded pointer-event queue. Producers drop events
    /// when the queue is full; the reconciliation sweep heals the gap.
    pub queue_capacity: usize,
    /// Maximum number of user subtrees accounted concurrently during the
    /// bootstrap sweep.
    pub sweep_concurrency: usize,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            usage_tolerance: 1024 * 1024,
            request_window_millis: 30_000,
            proof_window_millis: 120_000,
            queue_capacity: 1024,
            sweep_concurrency: 8,
        }
    }
}
