//! Statement machine (spec §4.5, §9 design notes "Gang commit atomicity").
//!
//! A statement holds its own working copy of the snapshot (spec §3
//! "Lifetimes": "Statements live within one solver invocation") and stages
//! operations directly against that copy; the real snapshot is untouched
//! until `commit` validates every touched node's invariants and merges the
//! working copy in. `Discard` just drops the working copy, which is
//! byte-for-byte equivalent to never having staged anything (spec §8
//! testable property 8).

use std::collections::HashSet;

use thiserror::Error;

use common::{ResourceVector, Uid};

use crate::model::{NodeInvariantError, PodStatus};
use crate::snapshot::Snapshot;

#[derive(Debug, Error)]
pub enum StatementError {
    #[error("node '{0}' not found")]
    UnknownNode(String),
    #[error("pod {0} not found")]
    UnknownPod(Uid),
    #[error("job {0} not found")]
    UnknownJob(Uid),
    #[error("pod {0} has no assigned node to evict from")]
    PodNotPlaced(Uid),
    #[error("node '{node}' has insufficient idle resources for this allocation")]
    InsufficientIdle { node: String },
    #[error("per-gpu sharing capacity exceeded on node '{node}' gpu '{gpu}'")]
    GpuShareExceeded { node: String, gpu: String },
    #[error("node invariant violated after staged ops: {0}")]
    NodeInvariant(#[from] NodeInvariantError),
}

#[derive(Debug, Clone)]
enum StagedOp {
    Allocate { pod: Uid },
    Pipeline { pod: Uid },
    Evict { pod: Uid },
}

/// Result of a successful [`Statement::commit`], naming the pods actually
/// affected so the caller (an `Action`) can report "actually-preempted task
/// names" (spec §4.3 step 4).
#[derive(Debug, Default)]
pub struct CommitReport {
    pub allocated: Vec<Uid>,
    pub pipelined: Vec<Uid>,
    pub evicted: Vec<Uid>,
}

/// A single solver attempt's staged operations (spec §4.5). Dropped without
/// effect unless [`Statement::commit`] is called.
pub struct Statement {
    working: Snapshot,
    ops: Vec<StagedOp>,
    touched_nodes: HashSet<String>,
}

impl Statement {
    pub fn new(baseline: &Snapshot) -> Self {
        Self {
            working: baseline.clone(),
            ops: Vec::new(),
            touched_nodes: HashSet::new(),
        }
    }

    pub fn effective_idle(&self, node: &str) -> ResourceVector {
        self.working.node(node).map(|n| n.idle).unwrap_or_default()
    }

    pub fn effective_job_allocated(&self, job: &Uid) -> ResourceVector {
        self.working
            .pod_group(job)
            .map(|pg| pg.allocated)
            .unwrap_or_default()
    }

    pub fn effective_pod_status(&self, pod: &Uid) -> Option<PodStatus> {
        self.working.pod(pod).map(|p| p.status)
    }

    /// `Allocate(pod, node)`: decrements node idle, increments node used and
    /// the job's allocated vector, advances the pod to `Allocated`.
    pub fn allocate(
        &mut self,
        pod: &Uid,
        node: &str,
        resources: ResourceVector,
    ) -> Result<(), StatementError> {
        self.reserve(pod, node, resources, PodStatus::Allocated)?;
        self.ops.push(StagedOp::Allocate { pod: pod.clone() });
        Ok(())
    }

    /// `Pipeline(pod, node)`: same resource movement as `Allocate` — idle to
    /// used — but the pod becomes `Pipelined`, a soft reservation pending
    /// confirmation (spec §4.5).
    pub fn pipeline(
        &mut self,
        pod: &Uid,
        node: &str,
        resources: ResourceVector,
    ) -> Result<(), StatementError> {
        self.reserve(pod, node, resources, PodStatus::Pipelined)?;
        self.ops.push(StagedOp::Pipeline { pod: pod.clone() });
        Ok(())
    }

    fn reserve(
        &mut self,
        pod: &Uid,
        node_name: &str,
        resources: ResourceVector,
        status: PodStatus,
    ) -> Result<(), StatementError> {
        if !self.working.pods.contains_key(pod) {
            return Err(StatementError::UnknownPod(pod.clone()));
        }
        let job = self.working.pods[pod].pod_group_uid.clone();
        {
            let node = self
                .working
                .node_mut(node_name)
                .ok_or_else(|| StatementError::UnknownNode(node_name.to_string()))?;
            // A `Pipelined` reservation is soft — it may draw against
            // `releasing` capacity a victim eviction just staged on this same
            // node, banking on that eviction actually landing by the time
            // this placement is confirmed. `Allocated` reservations are hard
            // and may only draw against capacity that is idle right now.
            let available = match status {
                PodStatus::Pipelined => node.idle + node.releasing,
                _ => node.idle,
            };
            if !resources.fits_within(&available) {
                return Err(StatementError::InsufficientIdle {
                    node: node_name.to_string(),
                });
            }
            node.idle -= resources;
            node.used += resources;
        }
        if let Some(pg) = self.working.pod_group_mut(&job) {
            pg.allocated += resources;
        } else {
            return Err(StatementError::UnknownJob(job));
        }
        if let Some(p) = self.working.pod_mut(pod) {
            p.status = status;
            p.node_name = Some(node_name.to_string());
        }
        self.touched_nodes.insert(node_name.to_string());
        Ok(())
    }

    /// `Evict(pod)`: moves the pod to `Releasing` and decrements the job's
    /// allocated vector. A pod that was only ever `Pipelined` — a soft
    /// reservation that never got externally confirmed — never actually
    /// consumed node capacity, so its resources return straight to `idle`.
    /// A pod that was genuinely `Allocated`/`Running`/`Bound` is still
    /// physically occupying the node until some future confirmation; it
    /// moves into `releasing`, a credited-but-not-yet-idle pool that a
    /// `Pipelined` reservation elsewhere in the same statement may draw
    /// against (spec §4.5, §4.4 "recorded victims"), while `used` stays put
    /// so `releasing <= used` keeps holding.
    pub fn evict(&mut self, pod: &Uid, resources: ResourceVector) -> Result<(), StatementError> {
        let (job, node_name, was_pipelined) = {
            let p = self
                .working
                .pod(pod)
                .ok_or_else(|| StatementError::UnknownPod(pod.clone()))?;
            let node_name = p
                .node_name
                .clone()
                .ok_or_else(|| StatementError::PodNotPlaced(pod.clone()))?;
            (p.pod_group_uid.clone(), node_name, p.status == PodStatus::Pipelined)
        };
        {
            let node = self
                .working
                .node_mut(&node_name)
                .ok_or_else(|| StatementError::UnknownNode(node_name.clone()))?;
            if was_pipelined {
                node.used -= resources;
                node.idle += resources;
            } else {
                node.releasing += resources;
            }
        }
        if let Some(pg) = self.working.pod_group_mut(&job) {
            pg.allocated -= resources;
        }
        if let Some(p) = self.working.pod_mut(pod) {
            p.status = PodStatus::Releasing;
        }
        self.touched_nodes.insert(node_name);
        self.ops.push(StagedOp::Evict { pod: pod.clone() });
        Ok(())
    }

    /// Claims `bytes` of shared memory on a specific physical GPU for a
    /// fractional-GPU pod, enforcing `used + releasing <= capacity` (spec
    /// §4.5 "GPU sharing invariant").
    pub fn claim_shared_gpu(
        &mut self,
        node_name: &str,
        gpu_id: &str,
        bytes: i64,
    ) -> Result<(), StatementError> {
        let node = self
            .working
            .node_mut(node_name)
            .ok_or_else(|| StatementError::UnknownNode(node_name.to_string()))?;
        let share = node.gpu_sharing.per_gpu.entry(gpu_id.to_string()).or_default();
        if share.used_bytes + bytes + share.releasing_bytes > share.capacity_bytes {
            return Err(StatementError::GpuShareExceeded {
                node: node_name.to_string(),
                gpu: gpu_id.to_string(),
            });
        }
        share.used_bytes += bytes;
        self.touched_nodes.insert(node_name.to_string());
        Ok(())
    }

    /// Releases `bytes` previously claimed on a shared GPU (mirrors
    /// `evict`'s used-to-releasing transfer at the per-GPU level).
    pub fn release_shared_gpu(&mut self, node_name: &str, gpu_id: &str, bytes: i64) {
        if let Some(node) = self.working.node_mut(node_name) {
            let share = node.gpu_sharing.per_gpu.entry(gpu_id.to_string()).or_default();
            share.used_bytes -= bytes;
            share.releasing_bytes += bytes;
            self.touched_nodes.insert(node_name.to_string());
        }
    }

    /// Drops the working copy without touching the real snapshot (spec §8
    /// testable property 8). Returns the number of ops that were discarded,
    /// for logging.
    pub fn discard(self) -> usize {
        self.ops.len()
    }

    /// Validates every touched node's invariants on the working copy, and
    /// only if all hold, replaces the corresponding entries in `snapshot`.
    /// On error, `snapshot` is left completely untouched.
    pub fn commit(self, snapshot: &mut Snapshot) -> Result<CommitReport, StatementError> {
        for node_name in &self.touched_nodes {
            let node = self
                .working
                .node(node_name)
                .ok_or_else(|| StatementError::UnknownNode(node_name.clone()))?;
            node.check_invariants()?;
        }

        for node_name in &self.touched_nodes {
            if let Some(node) = self.working.node(node_name) {
                snapshot.nodes.insert(node_name.clone(), node.clone());
            }
        }
        for pod_group in self.working.pod_groups.values() {
            snapshot
                .pod_groups
                .insert(pod_group.uid.clone(), pod_group.clone());
        }
        for pod in self.working.pods.values() {
            snapshot.pods.insert(pod.uid.clone(), pod.clone());
        }

        let mut report = CommitReport::default();
        for op in self.ops {
            match op {
                StagedOp::Allocate { pod } => report.allocated.push(pod),
                StagedOp::Pipeline { pod } => report.pipelined.push(pod),
                StagedOp::Evict { pod } => report.evicted.push(pod),
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, Pod, PodGroup, Preemptibility, Queue};
    use crate::snapshot::FixtureSource;

    fn fixture() -> Snapshot {
        let node = Node::new("n1", ResourceVector::new(4000, 4096, 8));
        let pg = PodGroup {
            uid: Uid::new("pg1"),
            namespace: "ns".into(),
            queue: "q1".into(),
            priority: 10,
            explicit_preemptibility: Some(Preemptibility::Preemptible),
            min_available: 1,
            creation_timestamp: chrono::Utc::now(),
            topology_constraint: None,
            sub_groups: vec![],
            conditions: vec![],
            allocated: ResourceVector::zero(),
            requested: ResourceVector::new(0, 0, 2),
            task_count: 1,
        };
        let pod = Pod::new("p1", "pg1", ResourceVector::new(0, 0, 2));
        Snapshot::load(&FixtureSource {
            pod_groups: vec![pg],
            pods: vec![pod],
            nodes: vec![node],
            queues: vec![
                Queue::root("root"),
                Queue::leaf("q1", "root", ResourceVector::new(0, 0, 8)),
            ],
        })
        .unwrap()
    }

    #[test]
    fn allocate_then_commit_moves_idle_to_used() {
        let mut snap = fixture();
        let mut stmt = Statement::new(&snap);
        stmt.allocate(&Uid::new("p1"), "n1", ResourceVector::new(0, 0, 2))
            .unwrap();
        let report = stmt.commit(&mut snap).unwrap();

        let node = snap.node("n1").unwrap();
        assert_eq!(node.idle.gpu, 6);
        assert_eq!(node.used.gpu, 2);
        assert_eq!(snap.pod_group(&Uid::new("pg1")).unwrap().allocated.gpu, 2);
        assert_eq!(snap.pod(&Uid::new("p1")).unwrap().status, PodStatus::Allocated);
        assert_eq!(report.allocated, vec![Uid::new("p1")]);
    }

    #[test]
    fn allocate_beyond_idle_is_rejected() {
        let snap = fixture();
        let mut stmt = Statement::new(&snap);
        let err = stmt
            .allocate(&Uid::new("p1"), "n1", ResourceVector::new(0, 0, 100))
            .unwrap_err();
        assert!(matches!(err, StatementError::InsufficientIdle { .. }));
    }

    #[test]
    fn discard_leaves_snapshot_untouched() {
        let snap = fixture();
        let before_idle = snap.node("n1").unwrap().idle;
        let before_allocated = snap.pod_group(&Uid::new("pg1")).unwrap().allocated;
        let mut stmt = Statement::new(&snap);
        stmt.allocate(&Uid::new("p1"), "n1", ResourceVector::new(0, 0, 2))
            .unwrap();
        assert_eq!(stmt.discard(), 1);
        assert_eq!(snap.node("n1").unwrap().idle, before_idle);
        assert_eq!(snap.pod_group(&Uid::new("pg1")).unwrap().allocated, before_allocated);
    }

    #[test]
    fn evicting_an_allocated_pod_marks_releasing_without_freeing_idle() {
        let mut snap = fixture();
        let mut stmt = Statement::new(&snap);
        stmt.allocate(&Uid::new("p1"), "n1", ResourceVector::new(0, 0, 2))
            .unwrap();
        stmt.commit(&mut snap).unwrap();

        let mut stmt = Statement::new(&snap);
        stmt.evict(&Uid::new("p1"), ResourceVector::new(0, 0, 2)).unwrap();
        let report = stmt.commit(&mut snap).unwrap();

        let node = snap.node("n1").unwrap();
        // The victim is still physically occupying the node until some
        // future confirmation; eviction only flags it `releasing`, it does
        // not yet return the capacity to `idle`.
        assert_eq!(node.idle.gpu, 6);
        assert_eq!(node.used.gpu, 2);
        assert_eq!(node.releasing.gpu, 2);
        assert_eq!(snap.pod_group(&Uid::new("pg1")).unwrap().allocated.gpu, 0);
        assert_eq!(snap.pod(&Uid::new("p1")).unwrap().status, PodStatus::Releasing);
        assert_eq!(report.evicted, vec![Uid::new("p1")]);
    }

    #[test]
    fn evicting_a_pipelined_pod_returns_its_reservation_to_idle() {
        let mut snap = fixture();
        let mut stmt = Statement::new(&snap);
        stmt.pipeline(&Uid::new("p1"), "n1", ResourceVector::new(0, 0, 2))
            .unwrap();
        stmt.commit(&mut snap).unwrap();

        let mut stmt = Statement::new(&snap);
        stmt.evict(&Uid::new("p1"), ResourceVector::new(0, 0, 2)).unwrap();
        let report = stmt.commit(&mut snap).unwrap();

        let node = snap.node("n1").unwrap();
        assert_eq!(node.idle.gpu, 8);
        assert_eq!(node.used.gpu, 0);
        assert_eq!(node.releasing.gpu, 0);
        assert_eq!(snap.pod_group(&Uid::new("pg1")).unwrap().allocated.gpu, 0);
        assert_eq!(report.evicted, vec![Uid::new("p1")]);
    }

    #[test]
    fn pipelined_reservation_may_draw_against_a_same_statement_victim() {
        let mut snap = fixture();
        let mut stmt = Statement::new(&snap);
        stmt.allocate(&Uid::new("p1"), "n1", ResourceVector::new(0, 0, 2))
            .unwrap();
        stmt.commit(&mut snap).unwrap();

        // n1 now has idle=6, used=2. Evicting p1 (still Allocated) credits
        // `releasing`, not `idle`; a pipelined placement for a different pod
        // must still be able to draw against that releasing credit.
        let second_pod = Pod::new("p2", "pg1", ResourceVector::new(0, 0, 8));
        snap.pods.insert(second_pod.uid.clone(), second_pod);

        let mut stmt = Statement::new(&snap);
        stmt.evict(&Uid::new("p1"), ResourceVector::new(0, 0, 2)).unwrap();
        stmt.pipeline(&Uid::new("p2"), "n1", ResourceVector::new(0, 0, 8))
            .unwrap();
        let report = stmt.commit(&mut snap).unwrap();

        let node = snap.node("n1").unwrap();
        assert_eq!(node.idle.gpu, -2, "borrowing against releasing credit may push idle negative until confirmed");
        assert_eq!(node.used.gpu, 10);
        assert_eq!(node.releasing.gpu, 2);
        assert_eq!(report.pipelined, vec![Uid::new("p2")]);
        assert_eq!(report.evicted, vec![Uid::new("p1")]);
    }
}
