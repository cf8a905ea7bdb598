//! Core scheduling knobs (spec §6). The daemon's own config (everything in
//! §6, including the flags the core never reads: metrics, webhook, leader
//! election) lives in `scheduler-daemon::config::Config`; this is the subset
//! the engine itself consumes, so `scheduler-core` can be driven from tests
//! without pulling in YAML parsing or CLI flags.

use std::collections::HashMap;
use std::time::Duration;

/// Exponential backoff bounds for the status updater's retry loop (spec §6,
/// design note (d)).
#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    pub base: Duration,
    pub max: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(100),
            max: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Hard cap on jobs held per leaf queue's ordering heap (spec §4.1).
    pub max_jobs_per_queue: u32,
    /// Per-action depth limit, keyed by action name (spec §6
    /// `jobs_depth_per_action`): how many jobs an action may attempt in one
    /// session cycle before yielding to the next action in the pipeline.
    pub jobs_depth_per_action: HashMap<String, u32>,
    /// Node label naming the topology level used by the node-pool-scoped
    /// scheduling conditions (spec §4.6).
    pub node_pool_label_key: String,
    pub status_updater_workers: usize,
    pub status_updater_backoff: BackoffConfig,
    /// Session cycles a job may sit with unresolved `Pipelined` pods before
    /// `StaleGangEviction` rolls it back (spec §4.2 gang commit atomicity).
    pub stale_pipeline_cycles: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_jobs_per_queue: 1000,
            jobs_depth_per_action: HashMap::new(),
            node_pool_label_key: "topology.scheduler/pool".to_string(),
            status_updater_workers: 4,
            status_updater_backoff: BackoffConfig::default(),
            stale_pipeline_cycles: 3,
        }
    }
}

impl CoreConfig {
    /// Depth limit for `action_name`, or `u32::MAX` when unconfigured (spec
    /// §6: absence means "no limit").
    pub fn depth_for(&self, action_name: &str) -> u32 {
        self.jobs_depth_per_action
            .get(action_name)
            .copied()
            .unwrap_or(u32::MAX)
    }
}
