use common::ResourceVector;

use crate::model::Queue;

/// Whether a queue/department comparison is ranking queues by their best
/// *pending* job (normal ordering) or their best *victim* candidate
/// (spec §4.1: "In victim mode, ordering compares the queues' best victim
/// candidates ... so that the queue with the least 'painful' eviction
/// loses first").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingMode {
    Pending,
    Victim,
}

/// Dominant Resource Fairness key for one queue, parameterised by its
/// over-quota weight and deserved share (spec §4.1, glossary "DRF",
/// "Over-quota weight"). `demand` is the resource vector of the queue's
/// best candidate job (pending job's requested resources in `Pending`
/// mode, or the candidate victim's allocated resources in `Victim` mode).
///
/// Lower key = more under-served relative to its weighted deserved share =
/// scheduled first in `Pending` mode. In `Victim` mode the same key is
/// used but the queue with the *highest* key (most over its weighted
/// share) is picked as the next victim source, since evicting from an
/// over-served queue is least painful.
pub fn drf_key(queue: &Queue, already_allocated: ResourceVector, demand: ResourceVector) -> f64 {
    let weighted_capacity = ResourceVector::new(
        scale(queue.deserved.cpu_millis, queue.over_quota_weight.cpu_millis),
        scale(queue.deserved.memory_bytes, queue.over_quota_weight.memory_bytes),
        scale(queue.deserved.gpu, queue.over_quota_weight.gpu),
    );
    let projected = already_allocated + demand;
    projected.dominant_share(&weighted_capacity)
}

fn scale(deserved: i64, weight: i64) -> i64 {
    let weight = weight.max(1);
    deserved.saturating_mul(weight).max(1)
}

/// Comparator between two queues' DRF keys. Max-heap convention:
/// `Ordering::Greater` means "pops before."
pub fn compare_keys(mode: OrderingMode, key_a: f64, key_b: f64) -> std::cmp::Ordering {
    let ord = key_b
        .partial_cmp(&key_a)
        .unwrap_or(std::cmp::Ordering::Equal);
    match mode {
        // Smaller (more under-served) key pops first: reverse of natural
        // float order, hence comparing b against a above.
        OrderingMode::Pending => ord,
        // Larger (more over-served) key pops first as a victim source.
        OrderingMode::Victim => ord.reverse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_served_queue_wins_in_pending_mode() {
        let q = Queue::leaf("q", "root", ResourceVector::new(100, 100, 10));
        let starved = drf_key(&q, ResourceVector::zero(), ResourceVector::new(10, 10, 1));
        let saturated = drf_key(&q, ResourceVector::new(90, 90, 9), ResourceVector::new(10, 10, 1));
        assert!(starved < saturated);
        assert_eq!(
            compare_keys(OrderingMode::Pending, starved, saturated),
            std::cmp::Ordering::Greater
        );
    }

    #[test]
    fn victim_mode_prefers_over_served_queue() {
        let q = Queue::leaf("q", "root", ResourceVector::new(100, 100, 10));
        let starved = drf_key(&q, ResourceVector::zero(), ResourceVector::new(10, 10, 1));
        let saturated = drf_key(&q, ResourceVector::new(90, 90, 9), ResourceVector::new(10, 10, 1));
        assert_eq!(
            compare_keys(OrderingMode::Victim, saturated, starved),
            std::cmp::Ordering::Greater
        );
    }
}
