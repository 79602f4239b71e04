//! Runtime knobs shared by the control loop and the reconcilers.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Pause between two ticks.
    pub interval: Duration,
    /// Upper bound on one kind's reconciliation within a tick.
    pub tick_timeout: Duration,
    /// Per-request deadline for backend RPCs.
    pub rpc_timeout: Duration,
    /// Per-request deadline for store reads and writes.
    pub store_timeout: Duration,
    /// Max concurrent per-entity tasks within one kind.
    pub concurrency: usize,
    /// Page size requested from list RPCs.
    pub page_size: i32,
    /// Longest pause between ticks while the store is unreachable.
    pub backoff_ceiling: Duration,
    /// Check connectors on every tick instead of only on repopulate ticks.
    pub probe_connectors_every_tick: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            tick_timeout: Duration::from_secs(120),
            rpc_timeout: Duration::from_secs(10),
            store_timeout: Duration::from_secs(5),
            concurrency: 32,
            page_size: 10,
            backoff_ceiling: Duration::from_secs(60),
            probe_connectors_every_tick: false,
        }
    }
}
