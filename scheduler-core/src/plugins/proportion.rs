//! Queue-order capability (spec §4.1 DRF), grounded on the teacher's
//! pluggable-`ScoringStrategy` shape in `node_resources_fit.rs` — here the
//! "strategy" is fixed to the plain DRF key ordering rather than
//! least/most-allocated; the orderer (`JobOrderer::cmp_opt`) passes in each
//! queue's already-computed key rather than this plugin touching
//! `Statement`/`Snapshot` state directly.

use std::cmp::Ordering;

use crate::ordering::drf::{compare_keys, OrderingMode};
use crate::plugins::QueueOrderPlugin;

pub struct Proportion;

impl QueueOrderPlugin for Proportion {
    fn name(&self) -> &str {
        "Proportion"
    }

    fn compare(&self, mode: OrderingMode, key_a: f64, key_b: f64) -> Ordering {
        compare_keys(mode, key_a, key_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defers_to_the_shared_drf_key_comparator() {
        let plugin = Proportion;
        assert_eq!(
            plugin.compare(OrderingMode::Pending, 0.1, 0.9),
            compare_keys(OrderingMode::Pending, 0.1, 0.9)
        );
    }
}
