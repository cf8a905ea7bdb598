//! Scheduling-condition append-and-collapse edit rules (spec §4.6, §8
//! testable property 4): the list is ordered so the most recent transition
//! for any `(condition_type, node_pool)` pair appears last; ids are
//! strictly increasing top-to-bottom; a duplicate key collapses into the
//! new entry rather than appending alongside it — which means the updated
//! entry moves to the end of the list, not just its id (spec §8 scenario
//! S4).

use chrono::Utc;

use crate::model::SchedulingCondition;

/// Applies `new_condition`, stamping the next transition id, dropping any
/// existing same-key entry, and appending the result at the end.
pub fn apply_condition(existing: &mut Vec<SchedulingCondition>, mut new_condition: SchedulingCondition) {
    let next_id = existing.iter().map(|c| c.transition_id).max().unwrap_or(0) + 1;
    new_condition.transition_id = next_id;

    existing.retain(|c| c.key() != new_condition.key());
    existing.push(new_condition);
}

/// Records that a job's pipeline pass for `node_pool` (here, its queue name
/// — the only node-pool-shaped grouping the core carries) ended without a
/// placement (spec §4.2 action loop step 4: "on failure, record ..."; §4.6
/// condition surface).
pub fn mark_unschedulable(conditions: &mut Vec<SchedulingCondition>, node_pool: &str, reason: &str, message: &str) {
    apply_condition(
        conditions,
        SchedulingCondition {
            condition_type: "Unschedulable".to_string(),
            node_pool: node_pool.to_string(),
            reason: reason.to_string(),
            message: message.to_string(),
            transition_id: 0,
            status: true,
            timestamp: Utc::now(),
        },
    )
}

/// Clears a prior `Unschedulable` condition for `node_pool` once a job
/// places successfully.
pub fn mark_schedulable(conditions: &mut Vec<SchedulingCondition>, node_pool: &str) {
    apply_condition(
        conditions,
        SchedulingCondition {
            condition_type: "Unschedulable".to_string(),
            node_pool: node_pool.to_string(),
            reason: "Scheduled".to_string(),
            message: "job placed successfully".to_string(),
            transition_id: 0,
            status: false,
            timestamp: Utc::now(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn condition(condition_type: &str, node_pool: &str, status: bool) -> SchedulingCondition {
        SchedulingCondition {
            condition_type: condition_type.to_string(),
            node_pool: node_pool.to_string(),
            reason: "reason".to_string(),
            message: "message".to_string(),
            transition_id: 0,
            status,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn same_key_condition_collapses_instead_of_appending() {
        let mut conditions = Vec::new();
        apply_condition(&mut conditions, condition("Unschedulable", "pool-a", true));
        apply_condition(&mut conditions, condition("Unschedulable", "pool-a", false));
        assert_eq!(conditions.len(), 1);
        assert!(!conditions[0].status);
    }

    #[test]
    fn updated_entry_moves_to_the_end_of_the_list() {
        let mut pool_x = condition("Unschedulable", "pool-x", true);
        pool_x.transition_id = 3;
        let mut pool_y = condition("Unschedulable", "pool-y", true);
        pool_y.transition_id = 2;
        let mut conditions = vec![pool_x, pool_y];

        let mut update = condition("Unschedulable", "pool-x", true);
        update.reason = "r".into();
        update.message = "m".into();
        apply_condition(&mut conditions, update);

        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].node_pool, "pool-y");
        assert_eq!(conditions[0].transition_id, 2);
        assert_eq!(conditions[1].node_pool, "pool-x");
        assert_eq!(conditions[1].transition_id, 4);
        assert_eq!(conditions[1].reason, "r");
        assert_eq!(conditions[1].message, "m");
    }

    #[test]
    fn transition_ids_strictly_increase_across_the_whole_list() {
        let mut conditions = Vec::new();
        apply_condition(&mut conditions, condition("Unschedulable", "pool-a", true));
        apply_condition(&mut conditions, condition("Preempting", "pool-b", true));
        apply_condition(&mut conditions, condition("Unschedulable", "pool-a", false));
        let ids: Vec<u64> = conditions.iter().map(|c| c.transition_id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.iter().all(|id| *id > 0));
        assert_ne!(ids[0], ids[1]);
        assert_eq!(conditions.iter().map(|c| c.transition_id).max().unwrap(), 3);
    }

    #[test]
    fn distinct_node_pools_do_not_collapse() {
        let mut conditions = Vec::new();
        apply_condition(&mut conditions, condition("Unschedulable", "pool-a", true));
        apply_condition(&mut conditions, condition("Unschedulable", "pool-b", true));
        assert_eq!(conditions.len(), 2);
    }

    #[test]
    fn mark_schedulable_clears_a_prior_unschedulable_condition() {
        let mut conditions = Vec::new();
        mark_unschedulable(&mut conditions, "q1", "NoCapacity", "no feasible node");
        assert!(conditions[0].status);
        mark_schedulable(&mut conditions, "q1");
        assert_eq!(conditions.len(), 1);
        assert!(!conditions[0].status);
        assert_eq!(conditions[0].reason, "Scheduled");
    }
}
