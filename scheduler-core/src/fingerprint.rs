//! Cross-session ordering fingerprint (spec §9 design notes, "Cross-session
//! caching"): a 64-bit hash over everything that can change the outcome of
//! job/queue ordering, so an unchanged cluster can skip rebuilding the
//! priority-queue structure.

use std::hash::{Hash, Hasher};

use crate::model::{Node, PodGroup, Queue};

/// FNV-1a, chosen for the same reason the design notes ask for a cheap,
/// deterministic, non-cryptographic fingerprint: this runs once per session
/// over potentially every job/queue/node in the cluster.
struct Fnv1a(u64);

impl Fnv1a {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    fn new() -> Self {
        Self(Self::OFFSET)
    }

    fn write(&mut self, bytes: &[u8]) {
        for b in bytes {
            self.0 ^= *b as u64;
            self.0 = self.0.wrapping_mul(Self::PRIME);
        }
    }
}

impl Hasher for Fnv1a {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        Fnv1a::write(self, bytes)
    }
}

/// Fields named in the design notes: "pod-group id/priority/queue/creation/
/// readiness/status-counts; queue id/priority/parent/children/creation/
/// quotas; queue usage; nodes names and GPU allocatable; action-depth
/// config."
pub fn ordering_fingerprint(
    pod_groups: &[&PodGroup],
    queues: &[&Queue],
    nodes: &[&Node],
    max_jobs_per_queue: u32,
) -> u64 {
    let mut hasher = Fnv1a::new();

    for pg in pod_groups {
        pg.uid.0.hash(&mut hasher);
        pg.priority.hash(&mut hasher);
        pg.queue.hash(&mut hasher);
        pg.creation_timestamp.timestamp_nanos_opt().unwrap_or(0).hash(&mut hasher);
        pg.min_available.hash(&mut hasher);
        pg.task_count.hash(&mut hasher);
    }

    for q in queues {
        q.name.hash(&mut hasher);
        q.parent.hash(&mut hasher);
        q.deserved.cpu_millis.hash(&mut hasher);
        q.deserved.memory_bytes.hash(&mut hasher);
        q.deserved.gpu.hash(&mut hasher);
        q.over_quota_weight.gpu.hash(&mut hasher);
    }

    for n in nodes {
        n.name.hash(&mut hasher);
        n.allocatable.gpu.hash(&mut hasher);
    }

    max_jobs_per_queue.hash(&mut hasher);

    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ResourceVector;

    #[test]
    fn identical_input_produces_identical_fingerprint() {
        let nodes = vec![Node::new("n1", ResourceVector::new(1000, 1000, 8))];
        let node_refs: Vec<&Node> = nodes.iter().collect();
        let a = ordering_fingerprint(&[], &[], &node_refs, 100);
        let b = ordering_fingerprint(&[], &[], &node_refs, 100);
        assert_eq!(a, b);
    }

    #[test]
    fn changing_max_jobs_changes_fingerprint() {
        let a = ordering_fingerprint(&[], &[], &[], 100);
        let b = ordering_fingerprint(&[], &[], &[], 200);
        assert_ne!(a, b);
    }
}
