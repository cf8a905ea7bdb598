use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use common::{ResourceVector, Uid};

/// Lifecycle state of a pod (spec §3 "Pod"). "Active allocated" (used by
/// the orderer's initialization filter and the job/queue accounting) spans
/// `Allocated`, `Pipelined`, `Running`, `Bound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PodStatus {
    Pending,
    Gated,
    Allocated,
    Pipelined,
    Running,
    Releasing,
    Succeeded,
    Failed,
    Bound,
}

impl PodStatus {
    /// "Active allocated" spans `Allocated`, `Pipelined`, `Running`, `Bound`.
    pub fn is_active_allocated(&self) -> bool {
        matches!(
            self,
            PodStatus::Allocated | PodStatus::Pipelined | PodStatus::Running | PodStatus::Bound
        )
    }
}

/// A node-affinity requirement, deliberately shallow: the full expressivity
/// of Kubernetes' `nodeAffinity`/`matchFields` lives in the node-affinity
/// filter (spec §4.4); here we just carry what the filter needs to
/// evaluate it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeAffinityRequirement {
    pub node_selector: HashMap<String, String>,
    pub required_match_expressions: Vec<MatchExpression>,
    /// `matchFields` against `metadata.name`; evaluated against *all*
    /// cluster nodes, not just the feasible set (spec §4.4).
    pub required_node_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchExpression {
    pub key: String,
    pub operator: MatchOperator,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOperator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

impl MatchExpression {
    pub fn matches(&self, label_value: Option<&String>) -> bool {
        match self.operator {
            MatchOperator::In => label_value.is_some_and(|v| self.values.contains(v)),
            MatchOperator::NotIn => !label_value.is_some_and(|v| self.values.contains(v)),
            MatchOperator::Exists => label_value.is_some(),
            MatchOperator::DoesNotExist => label_value.is_none(),
        }
    }
}

/// A pod inside a pod group (spec §3 "Pod").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pod {
    pub uid: Uid,
    pub namespace: String,
    pub pod_group_uid: Uid,
    /// `None` means the pod belongs to the implicit root sub-group.
    pub subgroup: Option<String>,
    pub resources: ResourceVector,
    /// Fractional-GPU annotation: `Some(0.25)` means the pod wants a quarter
    /// of one physical GPU's shared memory, not a whole device.
    pub gpu_fraction: Option<f64>,
    pub node_affinity: NodeAffinityRequirement,
    pub topology_labels: HashMap<String, String>,
    pub tolerations: Vec<super::node::Toleration>,
    pub status: PodStatus,
    pub node_name: Option<String>,
}

impl Pod {
    pub fn new(uid: impl Into<Uid>, pod_group_uid: impl Into<Uid>, resources: ResourceVector) -> Self {
        Self {
            uid: uid.into(),
            namespace: String::new(),
            pod_group_uid: pod_group_uid.into(),
            subgroup: None,
            resources,
            gpu_fraction: None,
            node_affinity: NodeAffinityRequirement::default(),
            topology_labels: HashMap::new(),
            tolerations: Vec::new(),
            status: PodStatus::Pending,
            node_name: None,
        }
    }

    pub fn with_subgroup(mut self, name: impl Into<String>) -> Self {
        self.subgroup = Some(name.into());
        self
    }

    pub fn has_affinity_requirements(&self) -> bool {
        !self.node_affinity.node_selector.is_empty()
            || !self.node_affinity.required_match_expressions.is_empty()
            || !self.node_affinity.required_node_names.is_empty()
    }
}
