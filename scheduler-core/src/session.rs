//! Ties a loaded snapshot to the plugin registry and action pipeline for
//! one scheduling pass (spec §2, §5 "single-threaded cooperative" model).
//! A session owns the only mutable handle to its snapshot; actions borrow
//! it mutably one at a time, staging and committing statements in place.

use std::collections::HashMap;

use common::Uid;

use crate::actions::{Action, ActionReport};
use crate::config::CoreConfig;
use crate::cycle_state::CycleState;
use crate::ordering::JobOrderCache;
use crate::plugins::Registry;
use crate::snapshot::{Snapshot, SnapshotSource};

/// A running pipeline pass over one snapshot. `scheduler-daemon` keeps a
/// single `Session` alive across ticks, replacing `snapshot` each cycle and
/// calling `run_pipeline`, so that `job_order_cache` and `pipelined_ticks`
/// carry forward rather than reset every tick.
pub struct Session {
    pub snapshot: Snapshot,
    pub registry: Registry,
    pub config: CoreConfig,
    pub cycle_state: CycleState,
    /// Consecutive cycles each pod group has spent with `Pipelined` pods
    /// that never confirmed (spec §4.2 `StaleGangEviction`). Lives on the
    /// session, not `CycleState`, because it must survive across the
    /// several sessions it takes a gang to go stale — `CycleState` is
    /// explicitly scoped to one cycle.
    pub pipelined_ticks: HashMap<Uid, u32>,
    /// Cached ordering heap skeletons, reused across sessions while the
    /// queue shape and quotas are unchanged (design notes, "Cross-session
    /// caching"). Outlives any one session the same way `pipelined_ticks`
    /// does, since its whole point is to survive into the next one.
    pub job_order_cache: JobOrderCache,
}

impl Session {
    pub fn new(snapshot: Snapshot, registry: Registry, config: CoreConfig) -> Self {
        Self {
            snapshot,
            registry,
            config,
            cycle_state: CycleState::default(),
            pipelined_ticks: HashMap::new(),
            job_order_cache: JobOrderCache::new(),
        }
    }

    /// Reloads `snapshot` from `source` in place, ahead of the next tick's
    /// `run_pipeline` call. Leaves `job_order_cache` and `pipelined_ticks`
    /// untouched so they carry forward across the reload.
    pub fn refresh(&mut self, source: &dyn SnapshotSource) -> anyhow::Result<()> {
        self.snapshot = Snapshot::load(source)?;
        Ok(())
    }

    /// Runs the fixed action pipeline in spec order: `Allocate`, `Reclaim`,
    /// `Preempt`, `Consolidate`, `StaleGangEviction` (spec §4.2).
    pub fn run_pipeline(&mut self) -> Vec<ActionReport> {
        let actions: Vec<Box<dyn Action>> = vec![
            Box::new(crate::actions::allocate::Allocate),
            Box::new(crate::actions::reclaim::Reclaim),
            Box::new(crate::actions::preempt::Preempt),
            Box::new(crate::actions::consolidate::Consolidate),
            Box::new(crate::actions::stale_gang_eviction::StaleGangEviction),
        ];
        actions.iter().map(|action| action.execute(self)).collect()
    }
}
