//! Daemon configuration file (spec §6). Everything the scheduling engine
//! itself reads lives on `scheduler_core::config::CoreConfig`; this struct
//! additionally carries the flags the core never reads (metrics, webhook,
//! leader election) so the on-disk schema matches what a real deployment
//! would hand the daemon, grounded directly on `rks::protocol::config`.

use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use scheduler_core::config::{BackoffConfig, CoreConfig};

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Path to (or address of) the cluster snapshot source; interpretation
    /// is left to the chosen `SnapshotSource` implementation.
    pub snapshot_source: String,
    /// How often the session loop pulls a fresh snapshot and re-runs the
    /// action pipeline.
    #[serde(with = "humantime_secs")]
    pub tick_interval: Duration,

    pub queue_label_key: String,
    pub node_pool_label_key: String,
    pub max_jobs_per_queue: u32,
    #[serde(default)]
    pub jobs_depth_per_action: HashMap<String, u32>,
    pub stale_pipeline_cycles: u32,

    #[serde(default = "default_status_updater_workers")]
    pub status_updater_workers: usize,
    #[serde(with = "humantime_secs", default = "default_backoff_base")]
    pub status_updater_backoff_base: Duration,
    #[serde(with = "humantime_secs", default = "default_backoff_max")]
    pub status_updater_backoff_max: Duration,

    /// Accepted, not acted on: the status-condition API surface is an
    /// out-of-scope external collaborator (spec §1).
    #[serde(default)]
    pub enable_webhook: bool,
    #[serde(default)]
    pub metrics_listen_address: Option<String>,
    #[serde(default = "default_metrics_namespace")]
    pub metrics_namespace: String,
    #[serde(default)]
    pub queue_label_to_metric_label: HashMap<String, String>,
    #[serde(default)]
    pub queue_label_to_default_metric_value: HashMap<String, String>,
    #[serde(default)]
    pub qps: Option<f64>,
    #[serde(default)]
    pub burst: Option<u32>,
    #[serde(default)]
    pub scheduler_shard_name: Option<String>,
    /// Recorded so the config schema matches a real deployment's; leader
    /// election itself is an external collaborator (spec §1 out of scope).
    #[serde(default)]
    pub leader_elect: bool,
}

fn default_status_updater_workers() -> usize {
    4
}

fn default_backoff_base() -> Duration {
    Duration::from_millis(100)
}

fn default_backoff_max() -> Duration {
    Duration::from_secs(10)
}

fn default_metrics_namespace() -> String {
    "scheduler".to_string()
}

mod humantime_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

impl Config {
    /// Projects the flags `scheduler-core` actually consumes out of the
    /// full daemon schema.
    pub fn core_config(&self) -> CoreConfig {
        CoreConfig {
            max_jobs_per_queue: self.max_jobs_per_queue,
            jobs_depth_per_action: self.jobs_depth_per_action.clone(),
            node_pool_label_key: self.node_pool_label_key.clone(),
            status_updater_workers: self.status_updater_workers,
            status_updater_backoff: BackoffConfig {
                base: self.status_updater_backoff_base,
                max: self.status_updater_backoff_max,
            },
            stale_pipeline_cycles: self.stale_pipeline_cycles,
        }
    }
}

pub fn load_config(path: &str) -> Result<Config> {
    let content = fs::read_to_string(path).with_context(|| format!("failed to read config from {path}"))?;
    let cfg: Config = serde_yaml::from_str(&content).context("failed to parse YAML config")?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_minimal_config_with_defaults() {
        let yaml = r#"
snapshot_source: "/var/run/scheduler/snapshot.yaml"
tick_interval: 1.0
queue_label_key: "scheduler.rk8s.io/queue"
node_pool_label_key: "topology.scheduler/pool"
max_jobs_per_queue: 1000
stale_pipeline_cycles: 3
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.status_updater_workers, 4);
        assert_eq!(cfg.status_updater_backoff_base, Duration::from_millis(100));
        assert!(!cfg.leader_elect);
        assert_eq!(cfg.metrics_namespace, "scheduler");

        let core = cfg.core_config();
        assert_eq!(core.max_jobs_per_queue, 1000);
        assert_eq!(core.stale_pipeline_cycles, 3);
    }
}
