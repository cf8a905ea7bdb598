//! Pluggable capability registry (spec §9 design notes: "dynamic interface
//! for plugins"). Directly modeled on the teacher's `plugins::Registry`:
//! each capability is a trait, the registry holds `Vec<Arc<dyn Trait>>` per
//! capability, and a `Default` impl wires the concrete plugins this crate
//! ships in a fixed order. Capabilities: job-order, queue-order, task-order,
//! predicate, scorer, victim-filter, bind-mutator, http-handler.
//!
//! `http-handler` is an interface-only capability: the outward-facing
//! surface (metrics, webhooks) is out of scope (spec §1), so the trait
//! exists for schema completeness but the default registry wires none.

pub mod bind_mutator;
pub mod elastic;
pub mod gpu_packing;
pub mod node_affinity;
pub mod node_resources_fit;
pub mod priority;
pub mod proportion;
pub mod taint_toleration;
pub mod topology;

use std::cmp::Ordering;
use std::sync::Arc;

use crate::model::{Node, Pod, PodGroup};
use crate::ordering::OrderingMode;

/// Orders jobs within a leaf queue (spec §4.1). `JobOrderer` already
/// hardcodes the priority/elastic/creation/uid chain directly (it's on the
/// ordering hot path and needs a `BinaryHeap`-friendly `Ord`), so this
/// capability exists for pipeline composability and is consulted by
/// `queue-order`'s DRF tiebreak when two queues are otherwise equal.
pub trait JobOrderPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn compare(&self, a: &PodGroup, b: &PodGroup) -> Ordering;
}

/// Orders queues relative to each other (spec §4.1 DRF). `key_a`/`key_b` are
/// each queue's already-computed DRF key (`ordering::drf::drf_key`) against
/// its own best candidate job; `mode` says whether the caller wants the
/// most-under-served queue first (`Pending`) or the most-over-served queue
/// first, as a victim source (`Victim`). The plugin owns only the choice of
/// *how* to compare two keys, not how a key is computed.
pub trait QueueOrderPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn compare(&self, mode: OrderingMode, key_a: f64, key_b: f64) -> Ordering;
}

/// Secondary ordering within a job's own tasks (elastic gangs: which pods to
/// keep when only a subset can be placed).
pub trait TaskOrderPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn compare(&self, a: &Pod, b: &Pod) -> Ordering;
}

/// Hard feasibility check: a pod that fails any predicate cannot be placed
/// on that node under any scenario shape (spec §4.3).
pub trait PredicatePlugin: Send + Sync {
    fn name(&self) -> &str;
    fn fits(&self, pod: &Pod, node: &Node) -> bool;
}

/// Soft preference: ranks nodes that already passed every predicate (spec
/// §4.3 step 3). Higher is better; the gang allocator sums scorer outputs
/// per node when choosing among several feasible slots.
pub trait ScorerPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn score(&self, pod: &Pod, node: &Node) -> i64;
}

/// Decides whether a lower-priority pod group is even eligible to be named
/// a victim for a given preemptor (spec §4.4). Distinct from the solver's
/// accumulated filters, which additionally track victim-credit state across
/// scenario refinements within one solver call.
pub trait VictimFilterPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn eligible(&self, preemptor: &PodGroup, victim: &PodGroup) -> bool;
}

/// Runs once a pod has a node assignment, before the statement stages it
/// (spec §6 outputs: topology assignment / GPU-fraction slot annotations).
pub trait BindMutatorPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn mutate(&self, pod: &mut Pod, node: &Node, job: &PodGroup);
}

/// Interface-only: out of scope per spec §1 (no outward-facing HTTP surface
/// is implemented), kept so a future webhook/metrics layer has a seam.
pub trait HttpHandlerPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn path(&self) -> &str;
}

#[derive(Clone)]
pub struct Registry {
    pub job_order: Vec<Arc<dyn JobOrderPlugin>>,
    pub queue_order: Vec<Arc<dyn QueueOrderPlugin>>,
    pub task_order: Vec<Arc<dyn TaskOrderPlugin>>,
    pub predicates: Vec<Arc<dyn PredicatePlugin>>,
    pub scorers: Vec<Arc<dyn ScorerPlugin>>,
    pub victim_filters: Vec<Arc<dyn VictimFilterPlugin>>,
    pub bind_mutators: Vec<Arc<dyn BindMutatorPlugin>>,
    pub http_handlers: Vec<Arc<dyn HttpHandlerPlugin>>,
}

impl Registry {
    /// True iff `pod` clears every registered predicate on `node`.
    pub fn fits(&self, pod: &Pod, node: &Node) -> bool {
        self.predicates.iter().all(|p| p.fits(pod, node))
    }

    /// Sum of every scorer's output, the composite rank used to break ties
    /// among several predicate-feasible nodes.
    pub fn score(&self, pod: &Pod, node: &Node) -> i64 {
        self.scorers.iter().map(|s| s.score(pod, node)).sum()
    }

    pub fn run_bind_mutators(&self, pod: &mut Pod, node: &Node, job: &PodGroup) {
        for mutator in &self.bind_mutators {
            mutator.mutate(pod, node, job);
        }
    }

    pub fn victim_eligible(&self, preemptor: &PodGroup, victim: &PodGroup) -> bool {
        self.victim_filters
            .iter()
            .all(|f| f.eligible(preemptor, victim))
    }

    /// Folds the registered `queue_order` plugins left to right, the first
    /// plugin to return a non-`Equal` verdict wins (spec §4.1 DRF, queue-order
    /// capability). `Equal` when no plugin is registered or all agree.
    pub fn compare_queues(&self, mode: OrderingMode, key_a: f64, key_b: f64) -> Ordering {
        for plugin in &self.queue_order {
            let ord = plugin.compare(mode, key_a, key_b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Folds the registered `task_order` plugins the same way, used by the
    /// gang allocator to decide which of a job's own pods to attempt placing
    /// first when not all of them will fit (spec §4.3 edge cases, elastic
    /// jobs).
    pub fn compare_tasks(&self, a: &Pod, b: &Pod) -> Ordering {
        for plugin in &self.task_order {
            let ord = plugin.compare(a, b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            job_order: vec![Arc::new(priority::PrioritySort)],
            queue_order: vec![Arc::new(proportion::Proportion)],
            task_order: vec![Arc::new(elastic::ElasticTiebreak)],
            predicates: vec![
                Arc::new(node_resources_fit::NodeResourcesFit),
                Arc::new(taint_toleration::TaintToleration),
                Arc::new(node_affinity::NodeAffinityPredicate),
            ],
            scorers: vec![
                Arc::new(node_resources_fit::NodeResourcesFit),
                Arc::new(gpu_packing::GpuPacking),
                Arc::new(taint_toleration::TaintToleration),
            ],
            victim_filters: vec![Arc::new(topology::TopologyVictimEligibility)],
            bind_mutators: vec![Arc::new(bind_mutator::TopologyBindMutator)],
            http_handlers: vec![],
        }
    }
}
