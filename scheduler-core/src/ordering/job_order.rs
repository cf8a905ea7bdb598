use std::cmp::Ordering;

use common::{ResourceVector, Uid};

use crate::model::PodGroup;

/// Composed job ordering inside one queue (spec §4.1): "priority
/// (descending, numeric); then elastic-job tiebreaker (fewer tasks first);
/// then creation timestamp (older first) with UID as final tiebreaker."
///
/// A max-heap convention is used throughout the orderer: `Ordering::Greater`
/// means "pops before."
pub fn job_order(a: &PodGroup, b: &PodGroup) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| b.task_count.cmp(&a.task_count))
        .then_with(|| b.creation_timestamp.cmp(&a.creation_timestamp))
        .then_with(|| b.uid.cmp(&a.uid))
}

/// Wraps the minimal fields `job_order` needs so the per-queue heap doesn't
/// have to clone whole `PodGroup`s.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct JobEntry {
    pub uid: Uid,
    pub priority: i32,
    pub task_count: u32,
    pub creation_timestamp: common::Timestamp,
    pub queue: String,
    pub demand: ResourceVector,
}

impl From<&PodGroup> for JobEntry {
    fn from(pg: &PodGroup) -> Self {
        Self {
            uid: pg.uid.clone(),
            priority: pg.priority,
            task_count: pg.task_count,
            creation_timestamp: pg.creation_timestamp,
            queue: pg.queue.clone(),
            demand: pg.requested,
        }
    }
}

impl Ord for JobEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.task_count.cmp(&self.task_count))
            .then_with(|| other.creation_timestamp.cmp(&self.creation_timestamp))
            .then_with(|| other.uid.cmp(&self.uid))
    }
}

impl PartialOrd for JobEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(uid: &str, priority: i32, task_count: u32, secs: i64) -> JobEntry {
        JobEntry {
            uid: Uid::new(uid),
            priority,
            task_count,
            creation_timestamp: chrono::Utc.timestamp_opt(secs, 0).unwrap(),
            queue: "q".into(),
            demand: ResourceVector::zero(),
        }
    }

    #[test]
    fn higher_priority_wins() {
        let a = entry("a", 10, 1, 0);
        let b = entry("b", 5, 1, 0);
        assert_eq!(a.cmp(&b), Ordering::Greater);
    }

    #[test]
    fn fewer_tasks_wins_on_priority_tie() {
        let a = entry("a", 10, 2, 0);
        let b = entry("b", 10, 5, 0);
        assert_eq!(a.cmp(&b), Ordering::Greater);
    }

    #[test]
    fn older_creation_wins_remaining_tie() {
        let a = entry("a", 10, 2, 100);
        let b = entry("b", 10, 2, 200);
        assert_eq!(a.cmp(&b), Ordering::Greater);
    }

    #[test]
    fn uid_breaks_final_tie_deterministically() {
        let a = entry("a", 10, 2, 100);
        let b = entry("z", 10, 2, 100);
        assert_eq!(a.cmp(&b), Ordering::Greater);
    }
}
