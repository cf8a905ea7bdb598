//! Accumulated filters: per-solver-invocation state that persists across
//! scenario refinements for the same job (spec §4.4). Each filter owns its
//! own victim-dedup bookkeeping rather than sharing one through the
//! `Statement`, since a filter's notion of "freed capacity" is a local
//! scratch estimate used to decide feasibility *before* any allocation is
//! staged.

pub mod node_affinity;
pub mod topology_idle;
