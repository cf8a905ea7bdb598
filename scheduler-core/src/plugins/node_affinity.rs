//! Predicate capability, directly grounded on the teacher's
//! `plugins::node_affinity::NodeAffinity` filter, generalized from the
//! CPU/memory `NodeInfo` model to the richer node/pod model. Reuses the
//! same label/expression matching the solver's accumulated node-affinity
//! filter uses, so a predicate-stage rejection and a solver-stage rejection
//! never disagree.

use crate::model::{Node, Pod};
use crate::plugins::PredicatePlugin;
use crate::solver::filters::node_affinity::NodeAffinityFilter;

pub struct NodeAffinityPredicate;

impl PredicatePlugin for NodeAffinityPredicate {
    fn name(&self) -> &str {
        "NodeAffinity"
    }

    fn fits(&self, pod: &Pod, node: &Node) -> bool {
        if !pod.has_affinity_requirements() {
            return true;
        }
        NodeAffinityFilter::node_matches(pod, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ResourceVector;

    #[test]
    fn pod_without_requirements_fits_any_node() {
        let pod = Pod::new("p1", "pg1", ResourceVector::zero());
        let node = Node::new("n1", ResourceVector::zero());
        assert!(NodeAffinityPredicate.fits(&pod, &node));
    }

    #[test]
    fn mismatched_label_selector_is_rejected() {
        let mut pod = Pod::new("p1", "pg1", ResourceVector::zero());
        pod.node_affinity.node_selector.insert("gpu-type".into(), "a100".into());
        let node = Node::new("n1", ResourceVector::zero()).with_label("gpu-type", "v100");
        assert!(!NodeAffinityPredicate.fits(&pod, &node));
    }
}
