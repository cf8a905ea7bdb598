//! Per-job placement search (spec §4.3, §4.4). For one pod group the
//! allocator tries a small, fixed set of scenario shapes in order and stops
//! at the first one that places at least `min_available` pods — "first
//! complete scenario wins," no scoring across shapes. Accumulated filters
//! ([`filters::topology_idle::TopologyIdleFilter`],
//! [`filters::node_affinity::NodeAffinityFilter`]) are constructed once per
//! solver invocation by the caller and threaded through every scenario
//! attempt, so victim credit from an earlier, failed scenario still counts
//! in a later one (spec §4.4).

pub mod filters;

use std::collections::HashMap;

use common::{ResourceVector, Uid};

use crate::model::{Node, Pod, PodGroup};
use crate::plugins::Registry;
use filters::node_affinity::NodeAffinityFilter;
use filters::topology_idle::TopologyIdleFilter;

/// A candidate pod-to-node assignment. May place fewer than all of a job's
/// pods; the caller decides whether a partial plan still clears
/// `min_available`.
#[derive(Debug, Default, Clone)]
pub struct PlacementPlan {
    pub assignments: Vec<(Uid, String)>,
}

impl PlacementPlan {
    pub fn placed_count(&self) -> usize {
        self.assignments.len()
    }
}

#[derive(Debug, Clone, Copy)]
enum ScenarioShape {
    /// Pack pods onto as few nodes as possible, sticky to the last node used
    /// (minimizes fragmentation, favored by topology-constrained gangs).
    ByNode,
    /// Spread pods round-robin across candidate nodes (favored when no
    /// topology constraint forces co-location).
    ByJob,
}

/// Searches for a placement of `pending_pods` (all pods of one job still
/// needing a node) across `candidate_nodes`, which must already be the
/// feasible set for this job (post node-affinity and taint/toleration
/// filtering upstream). `topology_filter`, when the job carries a required
/// topology level, gates sub-group GPU demand against domain idle capacity
/// before any node-level assignment is attempted.
pub struct GangAllocator<'a> {
    pub candidate_nodes: Vec<&'a Node>,
    pub affinity_filter: &'a NodeAffinityFilter,
    pub all_nodes: &'a [&'a Node],
    pub topology_filter: Option<&'a TopologyIdleFilter>,
    /// Pods staged for eviction ahead of this placement attempt (spec §4.4
    /// "recorded victims"). Their resources are credited back onto their
    /// current node before node-level capacity is checked, so a victim set
    /// that only just frees room for the preemptor is actually found —
    /// without this, every scenario shape would see only the node's current
    /// raw idle and never place against a victim that hasn't committed yet.
    pub victims: &'a [Pod],
    /// Consulted to rank predicate-feasible slots (spec §4.3 step 3: "plugin
    /// scorers ... rank feasible slots") and to decide which of a job's own
    /// pods to attempt first when not all of them will fit (elastic gangs).
    pub registry: &'a Registry,
}

impl<'a> GangAllocator<'a> {
    pub fn place(&self, job: &PodGroup, pending_pods: &[Pod]) -> Option<PlacementPlan> {
        if let Some(topology_filter) = self.topology_filter {
            // Sub-groups (and the implicit root sub-group, keyed by `None`)
            // are solved jointly: their pods co-locate in one domain, so the
            // domain-fit check binpacks one aggregate demand per sub-group,
            // not one demand per pod.
            let mut by_subgroup: HashMap<Option<&str>, i64> = HashMap::new();
            for pod in pending_pods {
                *by_subgroup.entry(pod.subgroup.as_deref()).or_insert(0) += pod.resources.gpu;
            }
            let requirements: Vec<i64> = by_subgroup.into_values().collect();
            if !topology_filter.fits(&requirements) {
                return None;
            }
        }

        for shape in [ScenarioShape::ByNode, ScenarioShape::ByJob] {
            let plan = self.try_shape(shape, pending_pods);
            if plan.placed_count() >= job.min_available as usize {
                return Some(plan);
            }
        }
        None
    }

    fn try_shape(&self, shape: ScenarioShape, pending_pods: &[Pod]) -> PlacementPlan {
        let mut idle: HashMap<&str, ResourceVector> = self
            .candidate_nodes
            .iter()
            .map(|n| (n.name.as_str(), n.idle))
            .collect();
        for victim in self.victims {
            let Some(node_name) = victim.node_name.as_deref() else {
                continue;
            };
            if let Some(remaining) = idle.get_mut(node_name) {
                *remaining += victim.resources;
            }
        }
        let mut order: Vec<&Node> = self.candidate_nodes.clone();
        match shape {
            ScenarioShape::ByNode => {
                order.sort_by(|a, b| b.idle.gpu.cmp(&a.idle.gpu));
            }
            ScenarioShape::ByJob => {
                order.sort_by(|a, b| a.idle.gpu.cmp(&b.idle.gpu));
            }
        }

        // Elastic gangs may place fewer than `task_count` pods; `task_order`
        // decides which ones are attempted (and thus kept) first.
        let mut ranked_pods: Vec<&Pod> = pending_pods.iter().collect();
        ranked_pods.sort_by(|a, b| self.registry.compare_tasks(a, b).reverse());

        let mut plan = PlacementPlan::default();
        let mut cursor = 0usize;
        for pod in ranked_pods {
            if !self.affinity_filter.filter(pod, self.all_nodes) {
                continue;
            }
            if let Some(slot) = self.find_slot(shape, &order, &mut idle, pod, &mut cursor) {
                plan.assignments.push((pod.uid.clone(), slot));
            }
        }
        plan
    }

    /// Ranks every node that passes affinity and has idle room for `pod` by
    /// `registry.score` (spec §4.3 step 3) and takes the best; first-seen
    /// wins ties, preserving `order`'s shape-level tie-break. Scores against
    /// a node clone credited with this shape's in-progress remaining idle
    /// (`idle`), not the node's original, possibly stale snapshot idle.
    fn find_slot(
        &self,
        shape: ScenarioShape,
        order: &[&Node],
        idle: &mut HashMap<&str, ResourceVector>,
        pod: &Pod,
        cursor: &mut usize,
    ) -> Option<String> {
        match shape {
            ScenarioShape::ByNode => {
                let mut best: Option<(i64, &Node)> = None;
                for node in order {
                    if !self.affinity_filter.filter(pod, &[node]) {
                        continue;
                    }
                    let Some(remaining) = idle.get(node.name.as_str()) else {
                        continue;
                    };
                    if !pod.resources.fits_within(remaining) {
                        continue;
                    }
                    let mut credited = (*node).clone();
                    credited.idle = *remaining;
                    let score = self.registry.score(pod, &credited);
                    let better = match best {
                        Some((best_score, _)) => score > best_score,
                        None => true,
                    };
                    if better {
                        best = Some((score, *node));
                    }
                }
                let (_, node) = best?;
                let remaining = idle.get_mut(node.name.as_str())?;
                *remaining -= pod.resources;
                Some(node.name.clone())
            }
            ScenarioShape::ByJob => {
                let len = order.len();
                if len == 0 {
                    return None;
                }
                let mut best: Option<(i64, usize)> = None;
                for offset in 0..len {
                    let idx = (*cursor + offset) % len;
                    let node = order[idx];
                    if !self.affinity_filter.filter(pod, &[node]) {
                        continue;
                    }
                    let Some(remaining) = idle.get(node.name.as_str()) else {
                        continue;
                    };
                    if !pod.resources.fits_within(remaining) {
                        continue;
                    }
                    let mut credited = node.clone();
                    credited.idle = *remaining;
                    let score = self.registry.score(pod, &credited);
                    let better = match best {
                        Some((best_score, _)) => score > best_score,
                        None => true,
                    };
                    if better {
                        best = Some((score, offset));
                    }
                }
                let (_, offset) = best?;
                let idx = (*cursor + offset) % len;
                let node = order[idx];
                let remaining = idle.get_mut(node.name.as_str())?;
                *remaining -= pod.resources;
                *cursor = (*cursor + offset + 1) % len;
                Some(node.name.clone())
            }
        }
    }
}
