use serde::{Deserialize, Serialize};

use common::Timestamp;

/// One entry in a pod group's append-only scheduling-condition history
/// (spec §3 "SchedulingCondition"). Transition ids are strictly increasing
/// across the whole list; duplicates for the same `(condition_type,
/// node_pool)` collapse so only the newest survives (spec §4.6, §8
/// testable property 4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingCondition {
    pub condition_type: String,
    pub node_pool: String,
    pub reason: String,
    pub message: String,
    pub transition_id: u64,
    pub status: bool,
    pub timestamp: Timestamp,
}

impl SchedulingCondition {
    pub fn key(&self) -> (&str, &str) {
        (self.condition_type.as_str(), self.node_pool.as_str())
    }
}
