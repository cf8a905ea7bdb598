use serde::{Deserialize, Serialize};

use common::{ResourceVector, Timestamp, Uid};

use super::condition::SchedulingCondition;
use super::subgroup::SubGroup;
use super::topology::TopologyConstraint;

/// Priority threshold below which a pod group is preemptible when no
/// explicit label is set (spec §3 "PodGroup", §8 testable property 6).
pub const DEFAULT_PREEMPTIBLE_PRIORITY_THRESHOLD: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preemptibility {
    Preemptible,
    NonPreemptible,
}

/// A gang-scheduled set of pods (spec §3 "PodGroup").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodGroup {
    pub uid: Uid,
    pub namespace: String,
    pub queue: String,
    pub priority: i32,
    pub explicit_preemptibility: Option<Preemptibility>,
    pub min_available: u32,
    pub creation_timestamp: Timestamp,
    pub topology_constraint: Option<TopologyConstraint>,
    pub sub_groups: Vec<SubGroup>,
    pub conditions: Vec<SchedulingCondition>,
    pub allocated: ResourceVector,
    /// Total resources the gang asks for at `min_available` tasks; the
    /// demand side of the DRF key used by job/queue ordering (spec §4.1).
    pub requested: ResourceVector,
    /// Elastic jobs may succeed with fewer pods than requested down to
    /// `min_available` (spec §4.3 edge cases). `task_count` is the number
    /// of tasks currently requested; used as the elastic-job tiebreaker in
    /// job ordering (spec §4.1: "fewer tasks first").
    pub task_count: u32,
}

impl PodGroup {
    pub fn is_elastic(&self) -> bool {
        self.task_count > self.min_available
    }

    /// Resolves effective preemptibility per spec §8 testable property 6:
    /// an explicit label always dominates, even if the priority lookup used
    /// to compute the fallback fails; with no explicit label, a lookup
    /// failure propagates.
    pub fn resolve_preemptibility<E>(
        &self,
        priority_lookup: impl FnOnce() -> Result<i32, E>,
    ) -> Result<Preemptibility, E> {
        match self.explicit_preemptibility {
            Some(p) => {
                let _ = priority_lookup();
                Ok(p)
            }
            None => {
                let priority = priority_lookup()?;
                Ok(if priority < DEFAULT_PREEMPTIBLE_PRIORITY_THRESHOLD {
                    Preemptibility::Preemptible
                } else {
                    Preemptibility::NonPreemptible
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Uid;

    fn base(explicit: Option<Preemptibility>, priority: i32) -> PodGroup {
        PodGroup {
            uid: Uid::new("pg1"),
            namespace: "ns".into(),
            queue: "q1".into(),
            priority,
            explicit_preemptibility: explicit,
            min_available: 1,
            creation_timestamp: chrono::Utc::now(),
            topology_constraint: None,
            sub_groups: vec![],
            conditions: vec![],
            allocated: ResourceVector::zero(),
            requested: ResourceVector::zero(),
            task_count: 1,
        }
    }

    #[test]
    fn explicit_label_dominates_successful_lookup() {
        let pg = base(Some(Preemptibility::NonPreemptible), 5);
        let result = pg.resolve_preemptibility::<()>(|| Ok(5));
        assert_eq!(result, Ok(Preemptibility::NonPreemptible));
    }

    #[test]
    fn explicit_label_survives_lookup_error() {
        let pg = base(Some(Preemptibility::Preemptible), 500);
        let result: Result<_, &str> = pg.resolve_preemptibility(|| Err("boom"));
        assert_eq!(result, Ok(Preemptibility::Preemptible));
    }

    #[test]
    fn unset_falls_back_to_priority_threshold() {
        let low = base(None, 50);
        assert_eq!(
            low.resolve_preemptibility::<()>(|| Ok(50)),
            Ok(Preemptibility::Preemptible)
        );
        let high = base(None, 100);
        assert_eq!(
            high.resolve_preemptibility::<()>(|| Ok(100)),
            Ok(Preemptibility::NonPreemptible)
        );
    }

    #[test]
    fn unset_propagates_lookup_error() {
        let pg = base(None, 0);
        let result: Result<_, &str> = pg.resolve_preemptibility(|| Err("lookup failed"));
        assert_eq!(result, Err("lookup failed"));
    }
}
