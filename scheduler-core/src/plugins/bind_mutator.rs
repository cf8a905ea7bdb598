//! Bind-mutator capability, **[SUPPLEMENT]**: a new capability kind (spec
//! §6 outputs: "topology assignment / GPU-fraction slot annotations"),
//! following the same `Arc<dyn Trait>` registry shape as every other
//! capability here. Runs once a pod has a concrete node, stamping the
//! topology labels its sub-group constraint cares about so downstream
//! consumers (the out-of-scope binder) don't have to re-derive them.

use crate::model::{Node, Pod, PodGroup};
use crate::plugins::BindMutatorPlugin;

pub struct TopologyBindMutator;

impl BindMutatorPlugin for TopologyBindMutator {
    fn name(&self) -> &str {
        "TopologyBindMutator"
    }

    fn mutate(&self, pod: &mut Pod, node: &Node, job: &PodGroup) {
        let Some(constraint) = &job.topology_constraint else {
            return;
        };
        for level in [&constraint.required_level, &constraint.preferred_level]
            .into_iter()
            .flatten()
        {
            if let Some(value) = node.labels.get(level) {
                pod.topology_labels.insert(level.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TopologyConstraint;
    use common::{ResourceVector, Uid};

    #[test]
    fn stamps_required_level_label_onto_pod() {
        let node = Node::new("n1", ResourceVector::zero()).with_label("rack", "r1");
        let mut pod = Pod::new("p1", "pg1", ResourceVector::zero());
        let job = PodGroup {
            uid: Uid::new("pg1"),
            namespace: "ns".into(),
            queue: "q".into(),
            priority: 1,
            explicit_preemptibility: None,
            min_available: 1,
            creation_timestamp: chrono::Utc::now(),
            topology_constraint: Some(TopologyConstraint::new("tree").with_required_level("rack")),
            sub_groups: vec![],
            conditions: vec![],
            allocated: ResourceVector::zero(),
            requested: ResourceVector::zero(),
            task_count: 1,
        };
        TopologyBindMutator.mutate(&mut pod, &node, &job);
        assert_eq!(pod.topology_labels.get("rack"), Some(&"r1".to_string()));
    }
}
