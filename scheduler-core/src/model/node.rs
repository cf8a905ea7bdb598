use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use common::ResourceVector;

/// Taint/toleration model, grounded directly on the teacher's
/// `plugins::taint_toleration` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaintEffect {
    NoSchedule,
    PreferNoSchedule,
    NoExecute,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taint {
    pub key: String,
    pub value: String,
    pub effect: TaintEffect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TolerationOperator {
    Exists,
    Equal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Toleration {
    pub key: Option<String>,
    pub operator: TolerationOperator,
    pub value: String,
    pub effect: Option<TaintEffect>,
}

impl Toleration {
    pub fn tolerates(&self, taint: &Taint) -> bool {
        if let Some(effect) = self.effect
            && effect != taint.effect
        {
            return false;
        }
        match &self.key {
            None => true, // empty key with Exists operator tolerates everything
            Some(key) => {
                if key != &taint.key {
                    return false;
                }
                match self.operator {
                    TolerationOperator::Exists => true,
                    TolerationOperator::Equal => self.value == taint.value,
                }
            }
        }
    }
}

/// Per-GPU shared-memory bookkeeping for fractional-GPU workloads (spec §3
/// "Node", "GPU-sharing sub-state").
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PerGpuShare {
    pub capacity_bytes: i64,
    pub used_bytes: i64,
    pub releasing_bytes: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GpuSharingState {
    /// Keyed by physical GPU index/UUID.
    pub per_gpu: HashMap<String, PerGpuShare>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NodeInvariantError {
    #[error("node {node}: used+idle ({sum:?}) != allocatable ({allocatable:?})")]
    UsedIdleMismatch {
        node: String,
        sum: ResourceVector,
        allocatable: ResourceVector,
    },
    #[error("node {node}: releasing exceeds used on some axis")]
    ReleasingExceedsUsed { node: String },
    #[error("node {node}: gpu {gpu} used+releasing ({used_plus_releasing}) exceeds capacity ({capacity})")]
    GpuShareExceedsCapacity {
        node: String,
        gpu: String,
        used_plus_releasing: i64,
        capacity: i64,
    },
}

/// A cluster node (spec §3 "Node").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub allocatable: ResourceVector,
    pub idle: ResourceVector,
    pub used: ResourceVector,
    pub releasing: ResourceVector,
    pub labels: HashMap<String, String>,
    pub taints: Vec<Taint>,
    pub unschedulable: bool,
    /// DRA GPU count derived from resource slices carrying the GPU driver
    /// class; tracked here as a plain count since slice bookkeeping itself
    /// is the (out-of-scope) device manager's job.
    pub dra_gpu_count: i64,
    pub gpu_sharing: GpuSharingState,
}

impl Node {
    pub fn new(name: impl Into<String>, allocatable: ResourceVector) -> Self {
        Self {
            name: name.into(),
            allocatable,
            idle: allocatable,
            used: ResourceVector::zero(),
            releasing: ResourceVector::zero(),
            labels: HashMap::new(),
            taints: Vec::new(),
            unschedulable: false,
            dra_gpu_count: 0,
            gpu_sharing: GpuSharingState::default(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Spec §3 Node invariants, and spec §8 testable property 2: "for every
    /// node and every resource axis, idle+used = allocatable and releasing
    /// <= used, before and after every statement commit and rollback."
    pub fn check_invariants(&self) -> Result<(), NodeInvariantError> {
        let sum = self.idle + self.used;
        if sum.cpu_millis != self.allocatable.cpu_millis
            || sum.memory_bytes != self.allocatable.memory_bytes
            || sum.gpu != self.allocatable.gpu
        {
            return Err(NodeInvariantError::UsedIdleMismatch {
                node: self.name.clone(),
                sum,
                allocatable: self.allocatable,
            });
        }
        if self.releasing.cpu_millis > self.used.cpu_millis
            || self.releasing.memory_bytes > self.used.memory_bytes
            || self.releasing.gpu > self.used.gpu
        {
            return Err(NodeInvariantError::ReleasingExceedsUsed {
                node: self.name.clone(),
            });
        }
        for (gpu, share) in &self.gpu_sharing.per_gpu {
            if share.used_bytes + share.releasing_bytes > share.capacity_bytes {
                return Err(NodeInvariantError::GpuShareExceedsCapacity {
                    node: self.name.clone(),
                    gpu: gpu.clone(),
                    used_plus_releasing: share.used_bytes + share.releasing_bytes,
                    capacity: share.capacity_bytes,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_node_satisfies_invariants() {
        let node = Node::new("n1", ResourceVector::new(1000, 1024, 8));
        assert!(node.check_invariants().is_ok());
    }

    #[test]
    fn used_idle_mismatch_is_detected() {
        let mut node = Node::new("n1", ResourceVector::new(1000, 1024, 8));
        node.used.gpu += 1; // idle not decremented to match
        assert!(matches!(
            node.check_invariants(),
            Err(NodeInvariantError::UsedIdleMismatch { .. })
        ));
    }

    #[test]
    fn releasing_over_used_is_detected() {
        let mut node = Node::new("n1", ResourceVector::new(1000, 1024, 8));
        node.releasing.gpu = 1;
        assert!(matches!(
            node.check_invariants(),
            Err(NodeInvariantError::ReleasingExceedsUsed { .. })
        ));
    }

    #[test]
    fn exact_key_toleration_matches_effect_and_value() {
        let taint = Taint {
            key: "gpu".into(),
            value: "broken".into(),
            effect: TaintEffect::NoSchedule,
        };
        let toleration = Toleration {
            key: Some("gpu".into()),
            operator: TolerationOperator::Equal,
            value: "broken".into(),
            effect: Some(TaintEffect::NoSchedule),
        };
        assert!(toleration.tolerates(&taint));
    }
}
