//! Victim-filter capability (spec §4.4): coarse eligibility gate consulted
//! before a pod group is even considered as a victim candidate, ahead of
//! the solver's per-scenario accumulated topology filter
//! ([`crate::solver::filters::topology_idle`]). A victim is only eligible
//! if it is strictly lower priority than the preemptor — the accumulated
//! filter then decides whether evicting it actually helps a given scenario.

use crate::model::PodGroup;
use crate::plugins::VictimFilterPlugin;

pub struct TopologyVictimEligibility;

impl VictimFilterPlugin for TopologyVictimEligibility {
    fn name(&self) -> &str {
        "TopologyVictimEligibility"
    }

    fn eligible(&self, preemptor: &PodGroup, victim: &PodGroup) -> bool {
        victim.priority < preemptor.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ResourceVector, Uid};

    fn pg(priority: i32) -> PodGroup {
        PodGroup {
            uid: Uid::new("u"),
            namespace: "ns".into(),
            queue: "q".into(),
            priority,
            explicit_preemptibility: None,
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
    fn only_strictly_lower_priority_is_eligible() {
        let plugin = TopologyVictimEligibility;
        assert!(plugin.eligible(&pg(10), &pg(5)));
        assert!(!plugin.eligible(&pg(10), &pg(10)));
    }
}
