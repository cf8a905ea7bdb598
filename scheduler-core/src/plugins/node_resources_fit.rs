//! Predicate + scorer capability, grounded on the teacher's
//! `plugins::node_resources_fit::Fit`, generalized to a third resource axis
//! (GPU, including DRA-fractional sharing) alongside CPU/memory.

use crate::model::{Node, Pod};
use crate::plugins::{PredicatePlugin, ScorerPlugin};

pub struct NodeResourcesFit;

impl PredicatePlugin for NodeResourcesFit {
    fn name(&self) -> &str {
        "NodeResourcesFit"
    }

    fn fits(&self, pod: &Pod, node: &Node) -> bool {
        if node.unschedulable {
            return false;
        }
        if let Some(fraction) = pod.gpu_fraction {
            let _ = fraction; // fractional GPU fit is checked at claim time against PerGpuShare, not here
            return true;
        }
        pod.resources.fits_within(&node.idle)
    }
}

/// Least-allocated scoring (spec §4.3 step 3 "plugin scorers: best-fit"):
/// rewards nodes with more *remaining* idle capacity after the pod lands,
/// same intent as the teacher's `calculate_least_allocated_score` but
/// averaged over three axes instead of two.
impl ScorerPlugin for NodeResourcesFit {
    fn name(&self) -> &str {
        "NodeResourcesFit"
    }

    fn score(&self, pod: &Pod, node: &Node) -> i64 {
        let cpu = utilization(pod.resources.cpu_millis, node.idle.cpu_millis, node.allocatable.cpu_millis);
        let mem = utilization(pod.resources.memory_bytes, node.idle.memory_bytes, node.allocatable.memory_bytes);
        let gpu = utilization(pod.resources.gpu, node.idle.gpu, node.allocatable.gpu);
        let avg_utilization = (cpu + mem + gpu) / 3.0;
        ((1.0 - avg_utilization) * 100.0) as i64
    }
}

fn utilization(requested: i64, idle: i64, allocatable: i64) -> f64 {
    if allocatable <= 0 {
        return 0.0;
    }
    let used_after = allocatable - idle + requested;
    (used_after as f64 / allocatable as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ResourceVector;

    #[test]
    fn pod_exceeding_idle_fails_predicate() {
        let node = Node::new("n1", ResourceVector::new(1000, 1024, 1));
        let pod = Pod::new("p1", "pg1", ResourceVector::new(2000, 0, 0));
        assert!(!NodeResourcesFit.fits(&pod, &node));
    }

    #[test]
    fn emptier_node_scores_higher() {
        let mut busy = Node::new("busy", ResourceVector::new(1000, 0, 0));
        busy.idle.cpu_millis = 100;
        busy.used.cpu_millis = 900;
        let idle = Node::new("idle", ResourceVector::new(1000, 0, 0));
        let pod = Pod::new("p1", "pg1", ResourceVector::new(100, 0, 0));
        assert!(NodeResourcesFit.score(&pod, &idle) > NodeResourcesFit.score(&pod, &busy));
    }
}
