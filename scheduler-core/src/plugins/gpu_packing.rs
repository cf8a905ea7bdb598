//! Scorer capability, **[SUPPLEMENT]**: not present in the teacher, but
//! required by spec §4.3 step 3's "plugin scorers: best-fit, GPU packing,
//! node-level binpacking." Grounded on the same `ScorePlugin` shape as
//! `node_resources_fit`, content specific to GPU-scarce clusters: rewards
//! nodes that end up *more* GPU-utilized after the pod lands, the opposite
//! slope from least-allocated, since fragmenting GPUs across many
//! lightly-used nodes is the failure mode this scheduler exists to avoid.

use crate::model::{Node, Pod};
use crate::plugins::ScorerPlugin;

pub struct GpuPacking;

impl ScorerPlugin for GpuPacking {
    fn name(&self) -> &str {
        "GpuPacking"
    }

    fn score(&self, pod: &Pod, node: &Node) -> i64 {
        if node.allocatable.gpu <= 0 {
            return 0;
        }
        let used_after = node.allocatable.gpu - node.idle.gpu + pod.resources.gpu;
        let fraction = used_after as f64 / node.allocatable.gpu as f64;
        (fraction.clamp(0.0, 1.0) * 100.0) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ResourceVector;

    #[test]
    fn fuller_node_scores_higher() {
        let mut packed = Node::new("packed", ResourceVector::new(0, 0, 8));
        packed.idle.gpu = 1;
        packed.used.gpu = 7;
        let mostly_empty = Node::new("empty", ResourceVector::new(0, 0, 8));
        let pod = Pod::new("p1", "pg1", ResourceVector::new(0, 0, 1));
        assert!(GpuPacking.score(&pod, &packed) > GpuPacking.score(&pod, &mostly_empty));
    }
}
