//! Topology-aware idle-GPU filter (spec §4.4). Stateful across successive
//! `filter` calls within one solver invocation: a per-filter processed-
//! victims set makes sure a victim's freed GPUs are only credited to its
//! domain once, however many times the same scenario is re-filtered (spec
//! §8 testable property 7, scenario S5 "victim not double-counted").

use std::collections::HashSet;

use common::Uid;

use crate::model::{Node, Pod};

/// One domain's virtual idle-GPU capacity, as grouped by the constraint's
/// required topology level (e.g. `rack`).
#[derive(Debug, Clone)]
struct Domain {
    id: String,
    idle_gpu: i64,
}

pub struct TopologyIdleFilter {
    topology_key: String,
    /// Kept sorted descending by `idle_gpu`, per spec §4.4's sorted-greedy
    /// binpack requirement.
    domains: Vec<Domain>,
    processed_victims: HashSet<Uid>,
}

impl TopologyIdleFilter {
    /// Groups `nodes` into domains by the label named `topology_key` (the
    /// constraint's `required-level`), summing each domain's starting idle
    /// GPU count from node idle vectors.
    pub fn new(nodes: &[&Node], topology_key: &str) -> Self {
        let mut by_domain: std::collections::HashMap<String, i64> = std::collections::HashMap::new();
        for node in nodes {
            if let Some(domain_id) = node.labels.get(topology_key) {
                *by_domain.entry(domain_id.clone()).or_insert(0) += node.idle.gpu;
            }
        }
        let mut domains: Vec<Domain> = by_domain
            .into_iter()
            .map(|(id, idle_gpu)| Domain { id, idle_gpu })
            .collect();
        domains.sort_by(|a, b| b.idle_gpu.cmp(&a.idle_gpu));
        Self {
            topology_key: topology_key.to_string(),
            domains,
            processed_victims: HashSet::new(),
        }
    }

    /// Credits a potential or recorded victim's freed GPUs to its node's
    /// domain, exactly once regardless of how many times it's named across
    /// scenario refinements (spec §4.4 "Recorded (already-committed) victims
    /// count identically to potential ones").
    pub fn note_victim(&mut self, victim: &Pod, node_of_victim: &Node) {
        if !self.processed_victims.insert(victim.uid.clone()) {
            return;
        }
        let Some(domain_id) = node_of_victim.labels.get(&self.topology_key) else {
            return;
        };
        if let Some(domain) = self.domains.iter_mut().find(|d| &d.id == domain_id) {
            domain.idle_gpu += victim.resources.gpu;
            self.reposition(domain_id);
        }
    }

    /// Restores descending order after a domain's capacity grows, by
    /// bubbling it left past now-smaller neighbours (spec §4.4: "the domain
    /// list is repositioned leftward so subsequent greedy matches see the
    /// correct order").
    fn reposition(&mut self, domain_id: &str) {
        let Some(mut i) = self.domains.iter().position(|d| d.id == domain_id) else {
            return;
        };
        while i > 0 && self.domains[i].idle_gpu > self.domains[i - 1].idle_gpu {
            self.domains.swap(i, i - 1);
            i -= 1;
        }
    }

    /// Sorted greedy binpack (spec §4.4): sort `requirements` (one per
    /// preemptor sub-group pod-GPU need) descending, match each against the
    /// first domain with enough idle GPUs, on a scratch copy of the current
    /// domain capacities. Valid iff every non-zero requirement is matched.
    pub fn fits(&self, requirements: &[i64]) -> bool {
        let mut remaining: Vec<i64> = self.domains.iter().map(|d| d.idle_gpu).collect();
        let mut sorted_reqs: Vec<i64> = requirements.iter().copied().filter(|r| *r > 0).collect();
        sorted_reqs.sort_unstable_by(|a, b| b.cmp(a));

        'req: for req in sorted_reqs {
            for capacity in remaining.iter_mut() {
                if *capacity >= req {
                    *capacity -= req;
                    continue 'req;
                }
            }
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ResourceVector;

    fn node(name: &str, rack: &str, idle_gpu: i64) -> Node {
        Node::new(name, ResourceVector::new(0, 0, idle_gpu)).with_label("rack", rack)
    }

    #[test]
    fn fragmentation_with_equal_total_capacity_is_invalid() {
        let n1 = node("n1", "rack-1", 10);
        let n2 = node("n2", "rack-2", 9);
        let filter = TopologyIdleFilter::new(&[&n1, &n2], "rack");
        assert!(!filter.fits(&[8, 8, 3]));
    }

    #[test]
    fn non_fragmented_requirement_is_valid() {
        let n1 = node("n1", "rack-1", 10);
        let n2 = node("n2", "rack-2", 9);
        let filter = TopologyIdleFilter::new(&[&n1, &n2], "rack");
        assert!(filter.fits(&[8, 8, 2]));
    }

    #[test]
    fn repeated_filter_calls_with_same_victim_do_not_double_count() {
        let n1 = node("n1", "rack-1", 4);
        let victim_node = node("n1", "rack-1", 4);
        let mut filter = TopologyIdleFilter::new(&[&n1], "rack");
        let victim = Pod::new("victim", "pg-victim", ResourceVector::new(0, 0, 4));

        filter.note_victim(&victim, &victim_node);
        assert!(!filter.fits(&[10]));
        filter.note_victim(&victim, &victim_node);
        assert!(!filter.fits(&[10]));
    }

    #[test]
    fn domain_repositions_after_victim_credit() {
        let n1 = node("n1", "rack-1", 1);
        let n2 = node("n2", "rack-2", 9);
        let victim = Pod::new("victim", "pg-victim", ResourceVector::new(0, 0, 8));
        let mut filter = TopologyIdleFilter::new(&[&n1, &n2], "rack");
        assert_eq!(filter.domains[0].id, "rack-2");
        filter.note_victim(&victim, &n1);
        assert_eq!(filter.domains[0].id, "rack-1");
    }
}
