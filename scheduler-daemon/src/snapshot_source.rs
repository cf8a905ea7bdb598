//! File-based `SnapshotSource` (spec §1/§2: the binder, admission control
//! and pod-group construction are external collaborators out of scope for
//! this crate). A real deployment points this at the cluster API server;
//! this implementation reads the same four lists from one YAML document,
//! letting the daemon run end-to-end against a file a deployment tool
//! refreshes, mirroring the teacher's `Cache`-from-trusted-input framing.

use std::fs;

use anyhow::Context;
use serde::Deserialize;

use scheduler_core::model::{Node, Pod, PodGroup, Queue};
use scheduler_core::snapshot::SnapshotSource;

#[derive(Debug, Deserialize)]
struct SnapshotDocument {
    #[serde(default)]
    pod_groups: Vec<PodGroup>,
    #[serde(default)]
    pods: Vec<Pod>,
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    queues: Vec<Queue>,
}

pub struct YamlFileSource {
    path: String,
}

impl YamlFileSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> anyhow::Result<SnapshotDocument> {
        let content = fs::read_to_string(&self.path).with_context(|| format!("failed to read snapshot from {}", self.path))?;
        serde_yaml::from_str(&content).with_context(|| format!("failed to parse snapshot document at {}", self.path))
    }
}

impl SnapshotSource for YamlFileSource {
    fn list_pod_groups(&self) -> anyhow::Result<Vec<PodGroup>> {
        Ok(self.load()?.pod_groups)
    }

    fn list_pods(&self) -> anyhow::Result<Vec<Pod>> {
        Ok(self.load()?.pods)
    }

    fn list_nodes(&self) -> anyhow::Result<Vec<Node>> {
        Ok(self.load()?.nodes)
    }

    fn list_queues(&self) -> anyhow::Result<Vec<Queue>> {
        Ok(self.load()?.queues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_default_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.yaml");
        fs::write(&path, "pod_groups: []\n").unwrap();

        let source = YamlFileSource::new(path.to_str().unwrap());
        assert!(source.list_pod_groups().unwrap().is_empty());
        assert!(source.list_pods().unwrap().is_empty());
        assert!(source.list_nodes().unwrap().is_empty());
        assert!(source.list_queues().unwrap().is_empty());
    }

    #[test]
    fn loads_all_four_sections_from_one_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.yaml");
        fs::write(
            &path,
            r#"
queues:
  - name: q1
    parent: null
    kind: Leaf
    deserved: { cpu_millis: 2000, memory_bytes: 2048, gpu: 1 }
    limit: { cpu_millis: 4000, memory_bytes: 4096, gpu: 1 }
    over_quota_weight: { cpu_millis: 1, memory_bytes: 1, gpu: 1 }
nodes:
  - name: n1
    allocatable: { cpu_millis: 4000, memory_bytes: 4096, gpu: 1 }
    idle: { cpu_millis: 4000, memory_bytes: 4096, gpu: 1 }
    used: { cpu_millis: 0, memory_bytes: 0, gpu: 0 }
    releasing: { cpu_millis: 0, memory_bytes: 0, gpu: 0 }
    labels: {}
    taints: []
    unschedulable: false
    dra_gpu_count: 0
    gpu_sharing: { per_gpu: {} }
pod_groups:
  - uid: pg1
    namespace: default
    queue: q1
    priority: 0
    explicit_preemptibility: null
    min_available: 1
    creation_timestamp: "2024-01-01T00:00:00Z"
    topology_constraint: null
    sub_groups: []
    conditions: []
    allocated: { cpu_millis: 0, memory_bytes: 0, gpu: 0 }
    requested: { cpu_millis: 1000, memory_bytes: 1024, gpu: 0 }
    task_count: 1
pods:
  - uid: p1
    namespace: default
    pod_group_uid: pg1
    subgroup: null
    resources: { cpu_millis: 1000, memory_bytes: 1024, gpu: 0 }
    gpu_fraction: null
    node_affinity: { node_selector: {}, required_match_expressions: [], required_node_names: [] }
    topology_labels: {}
    tolerations: []
    status: Pending
    node_name: null
"#,
        )
        .unwrap();

        let source = YamlFileSource::new(path.to_str().unwrap());
        assert_eq!(source.list_queues().unwrap().len(), 1);
        assert_eq!(source.list_nodes().unwrap().len(), 1);
        assert_eq!(source.list_pod_groups().unwrap().len(), 1);
        assert_eq!(source.list_pods().unwrap().len(), 1);
    }

    #[test]
    fn malformed_document_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.yaml");
        fs::write(&path, "pod_groups: [this is not a pod group list\n").unwrap();

        let source = YamlFileSource::new(path.to_str().unwrap());
        let err = source.list_pod_groups().unwrap_err();
        assert!(err.to_string().contains("failed to parse snapshot document"));
    }
}
