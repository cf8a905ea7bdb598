//! Action pipeline (spec §4.2): a fixed ordered list of actions runs per
//! session. For each action, the pipeline rebuilds a job ordering filtered
//! for that action's intent, then for every popped job invokes the
//! scenario solver with a growing victim set until a complete gang places
//! or the victim source runs out.
//!
//! Scenario shapes here sit one layer above `solver::GangAllocator`'s own
//! by-node/by-job placement heuristic: here "scenario" means how the
//! *victim set* grows across solver attempts for one preemptor — fixing a
//! node set and evicting its occupants in priority order ("by-node"), or
//! pulling whole victim jobs one at a time from a victim-ordered queue
//! ("by-job") — while the allocator's own shapes describe how the
//! preemptor's own pods get packed once a victim set is fixed.

pub mod allocate;
pub mod consolidate;
pub mod preempt;
pub mod reclaim;
pub mod stale_gang_eviction;

use common::Uid;

use crate::model::PodGroup;
use crate::session::Session;

/// Outcome of one action's pass over its filtered job ordering.
#[derive(Debug, Default)]
pub struct ActionReport {
    pub action: &'static str,
    pub placed: Vec<Uid>,
    pub failed: Vec<Uid>,
    pub evicted: Vec<Uid>,
}

/// Shared shape for the five pipeline actions (spec §4.2), mirroring the
/// teacher's `Algorithm`/plugin-capability trait pattern: each action is a
/// zero-sized marker struct implementing this, registered in a fixed order
/// by `Session::run_pipeline`.
pub trait Action {
    fn name(&self) -> &'static str;

    /// Whether `job` is in scope for this action (spec §4.2 "rebuilds a
    /// `JobsOrderByQueues` filtered for that action's intent"). All five
    /// actions currently agree that a job is in scope while it carries
    /// pending demand; they differ only in victim scope, not in which
    /// preemptors they consider.
    fn intent_filter(&self, job: &PodGroup) -> bool {
        support::has_pending_demand(job)
    }

    fn execute(&self, session: &mut Session) -> ActionReport;
}

/// Helpers shared by the concrete action modules: building the filtered
/// preemptor ordering, gathering a job's still-unplaced pods, prefiltering
/// feasible nodes through the predicate plugins, and running the
/// accumulated-filter-gated solver attempt loop.
pub(crate) mod support {
    use std::collections::HashMap;

    use common::Uid;

    use crate::model::{Node, Pod, PodGroup, PodStatus, Queue};
    use crate::ordering::{self, JobOrderCache, JobOrderer, OrderingMode};
    use crate::plugins::Registry;
    use crate::snapshot::Snapshot;
    use crate::solver::filters::node_affinity::NodeAffinityFilter;
    use crate::solver::filters::topology_idle::TopologyIdleFilter;
    use crate::solver::GangAllocator;
    use crate::statement::Statement;

    pub fn has_pending_demand(job: &PodGroup) -> bool {
        job.allocated.cpu_millis < job.requested.cpu_millis
            || job.allocated.memory_bytes < job.requested.memory_bytes
            || job.allocated.gpu < job.requested.gpu
    }

    /// Builds a `Pending`-mode orderer over jobs passing `filter`, matching
    /// spec §4.1's `Initialize` admission checks at the data we actually
    /// carry: not-ready (below `min_available`'s task count) and the
    /// action's own intent filter. Orphan-queue and non-leaf jobs are
    /// dropped silently by `JobOrderer::push` itself.
    pub fn preemptor_orderer(
        snapshot: &Snapshot,
        cache: &mut JobOrderCache,
        max_jobs_per_queue: u32,
        registry: &Registry,
        filter: impl Fn(&PodGroup) -> bool,
    ) -> JobOrderer {
        let fp = fingerprint(snapshot, max_jobs_per_queue);
        let mut orderer = cache.orderer(OrderingMode::Pending, fp, &snapshot.queues, max_jobs_per_queue, registry);
        seed_allocated(&mut orderer, snapshot);
        for pg in snapshot.pod_groups.values() {
            if pg.task_count >= pg.min_available && filter(pg) {
                orderer.push(pg);
            }
        }
        orderer
    }

    /// Seeds every leaf queue's DRF `already_allocated` baseline from the
    /// snapshot's real current allocation, not the zero a freshly-built or
    /// cached `JobOrderer` skeleton starts with (`drf_key`'s
    /// `already_allocated` term, spec §4.1).
    fn seed_allocated(orderer: &mut JobOrderer, snapshot: &Snapshot) {
        for queue in snapshot.queues.all() {
            if snapshot.queues.is_leaf(&queue.name) {
                orderer.set_allocated(&queue.name, queue_allocated(snapshot, &queue.name));
            }
        }
    }

    fn fingerprint(snapshot: &Snapshot, max_jobs_per_queue: u32) -> u64 {
        let pod_groups: Vec<&PodGroup> = snapshot.pod_groups.values().collect();
        let queues: Vec<&Queue> = snapshot.queues.all().collect();
        let nodes: Vec<&Node> = snapshot.nodes.values().collect();
        ordering::ordering_fingerprint(&pod_groups, &queues, &nodes, max_jobs_per_queue)
    }

    /// Resources currently allocated to jobs parented at `queue_name`,
    /// summed directly from the snapshot rather than the job orderer's own
    /// bucket (the action may be consulting a queue that its own
    /// preemptor orderer never touched).
    pub fn queue_allocated(snapshot: &Snapshot, queue_name: &str) -> common::ResourceVector {
        snapshot
            .pod_groups
            .values()
            .filter(|pg| pg.queue == queue_name)
            .fold(common::ResourceVector::zero(), |acc, pg| acc + pg.allocated)
    }

    /// True once a queue's allocation exceeds its deserved share on any
    /// resource axis (spec §4.2 `Reclaim` victim scoping).
    pub fn is_over_deserved(snapshot: &Snapshot, queue_name: &str) -> bool {
        let Some(queue) = snapshot.queues.get(queue_name) else {
            return false;
        };
        !queue_allocated(snapshot, queue_name).fits_within(&queue.deserved)
    }

    /// A `Victim`-mode orderer over already-allocated jobs passing
    /// `filter`, used to pick eviction sources (spec §4.1 victim mode,
    /// §4.2 `Reclaim`/`Preempt` victim scoping).
    pub fn victim_orderer(
        snapshot: &Snapshot,
        cache: &mut JobOrderCache,
        max_jobs_per_queue: u32,
        registry: &Registry,
        filter: impl Fn(&PodGroup) -> bool,
    ) -> JobOrderer {
        let fp = fingerprint(snapshot, max_jobs_per_queue);
        let mut orderer = cache.orderer(OrderingMode::Victim, fp, &snapshot.queues, max_jobs_per_queue, registry);
        seed_allocated(&mut orderer, snapshot);
        for pg in snapshot.pod_groups.values() {
            if !pg.allocated.is_zero() && filter(pg) {
                orderer.push(pg);
            }
        }
        orderer
    }

    /// Pods of `job` not yet given a node: `Pending` or `Gated`.
    pub fn pending_pods(job: &Uid, snapshot: &Snapshot) -> Vec<Pod> {
        snapshot
            .pods_of(job)
            .filter(|p| matches!(p.status, PodStatus::Pending | PodStatus::Gated))
            .cloned()
            .collect()
    }

    /// Pods of `job` currently holding resources: eligible to be named
    /// victims (spec §4.2/§4.4).
    pub fn victim_pods(job: &Uid, snapshot: &Snapshot) -> Vec<Pod> {
        snapshot
            .pods_of(job)
            .filter(|p| p.status.is_active_allocated())
            .cloned()
            .collect()
    }

    /// Job-level node prefilter (spec §4.3 step 3 "placement ... consults
    /// plugin predicates"). Intra-job pods are assumed resource-homogeneous
    /// for this prefilter — a simplification recorded in the design
    /// ledger; the solver still re-checks idle fit and node affinity
    /// per pod.
    pub fn feasible_nodes<'a>(
        pending: &[Pod],
        nodes: &'a HashMap<String, Node>,
        registry: &Registry,
    ) -> Vec<&'a Node> {
        feasible_nodes_with_credit(pending, nodes, registry, &HashMap::new())
    }

    /// Sums `pods`' resources onto whichever node each currently occupies,
    /// keyed by node name. Used to credit a victim-eligible pool's worth of
    /// capacity back onto the nodes that hold it before the hard predicate
    /// prefilter runs, so `Reclaim`/`Preempt`/`Consolidate` don't lose a node
    /// from `candidate_nodes` purely because its idle is currently pinned
    /// down by pods the action is about to evict.
    pub fn credit_by_node(pods: &[Pod]) -> HashMap<String, common::ResourceVector> {
        let mut credit: HashMap<String, common::ResourceVector> = HashMap::new();
        for pod in pods {
            let Some(node_name) = &pod.node_name else {
                continue;
            };
            *credit.entry(node_name.clone()).or_insert_with(common::ResourceVector::zero) += pod.resources;
        }
        credit
    }

    /// Same prefilter as [`feasible_nodes`], but resource predicates run
    /// against each node's idle as if every pod in `victim_credit` had
    /// already been evicted. The solver's own `GangAllocator` carries the
    /// authoritative, incrementally-grown victim set (spec §4.4); this is
    /// only the coarse single-representative-pod prefilter, so it credits
    /// the *whole* pool a caller might draw victims from rather than the
    /// subset actually accumulated so far — a node that only becomes
    /// feasible after several victims are evicted must still reach the
    /// allocator, not be filtered out before the loop ever runs.
    pub fn feasible_nodes_with_credit<'a>(
        pending: &[Pod],
        nodes: &'a HashMap<String, Node>,
        registry: &Registry,
        victim_credit: &HashMap<String, common::ResourceVector>,
    ) -> Vec<&'a Node> {
        let Some(representative) = pending.first() else {
            return Vec::new();
        };
        nodes
            .values()
            .filter(|n| {
                if n.unschedulable {
                    return false;
                }
                match victim_credit.get(&n.name) {
                    Some(credit) => {
                        let mut credited = (*n).clone();
                        credited.idle += *credit;
                        registry.fits(representative, &credited)
                    }
                    None => registry.fits(representative, n),
                }
            })
            .collect()
    }

    /// One solver attempt: builds the accumulated filters for `job` over
    /// `candidate_nodes`, asks the gang allocator for a plan, and — if it
    /// clears `min_available` — stages `Allocate`/`Pipeline` ops plus any
    /// `victims`' `Evict` ops onto a single, not-yet-committed statement so
    /// the whole attempt commits or discards atomically (spec §9 "gang
    /// commit atomicity"). The caller commits against the real snapshot.
    pub fn attempt_placement(
        job: &PodGroup,
        pending: &[Pod],
        candidate_nodes: &[&Node],
        all_nodes: &[&Node],
        victims: &[Pod],
        snapshot: &Snapshot,
        registry: &Registry,
    ) -> Option<Statement> {
        let mut affinity_filter = NodeAffinityFilter::new(candidate_nodes.iter().map(|n| n.name.clone()));
        for victim in victims {
            affinity_filter.note_victim(victim);
        }

        let topology_filter = job.topology_constraint.as_ref().and_then(|c| {
            c.required_level.as_ref().map(|level| {
                let mut filter = TopologyIdleFilter::new(candidate_nodes, level);
                for victim in victims {
                    if let Some(node_name) = &victim.node_name
                        && let Some(node) = snapshot.node(node_name)
                    {
                        filter.note_victim(victim, node);
                    }
                }
                filter
            })
        });

        let allocator = GangAllocator {
            candidate_nodes: candidate_nodes.to_vec(),
            affinity_filter: &affinity_filter,
            all_nodes,
            topology_filter: topology_filter.as_ref(),
            victims,
            registry,
        };

        let plan = allocator.place(job, pending)?;
        if plan.placed_count() < job.min_available as usize {
            return None;
        }

        let mut statement = Statement::new(snapshot);
        for victim in victims {
            if let Err(e) = statement.evict(&victim.uid, victim.resources) {
                log::warn!("failed to stage eviction of victim {}: {e}", victim.uid);
                return None;
            }
        }

        let pods_by_uid: HashMap<&Uid, &Pod> = pending.iter().map(|p| (&p.uid, p)).collect();
        let preemptor_is_pipelined = !victims.is_empty();
        for (pod_uid, node_name) in &plan.assignments {
            let Some(pod) = pods_by_uid.get(pod_uid) else {
                continue;
            };
            let result = if preemptor_is_pipelined {
                statement.pipeline(pod_uid, node_name, pod.resources)
            } else {
                statement.allocate(pod_uid, node_name, pod.resources)
            };
            if let Err(e) = result {
                log::warn!("failed to stage placement of {pod_uid} on {node_name}: {e}");
                return None;
            }
        }

        Some(statement)
    }

    /// Runs the registered bind mutators over every pod a commit just
    /// placed (spec §6 outputs: topology assignment / GPU-fraction slot
    /// annotations), after the statement has merged into the real
    /// snapshot so the mutator sees the pod's final node assignment.
    pub fn apply_bind_mutators(snapshot: &mut Snapshot, registry: &Registry, job: &PodGroup, placed: &[Uid]) {
        for uid in placed {
            let Some(node_name) = snapshot.pods.get(uid).and_then(|p| p.node_name.clone()) else {
                continue;
            };
            let Some(node) = snapshot.nodes.get(&node_name).cloned() else {
                continue;
            };
            if let Some(pod) = snapshot.pods.get_mut(uid) {
                registry.run_bind_mutators(pod, &node, job);
            }
        }
    }
}
