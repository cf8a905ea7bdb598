//! Task-order capability: which of a job's own pods to keep when only a
//! subset can be placed (spec §4.3 edge cases, elastic jobs). Pods with no
//! sub-group (the gang's root) are never dropped ahead of sub-grouped pods;
//! ties break on UID for determinism.

use std::cmp::Ordering;

use crate::model::Pod;
use crate::plugins::TaskOrderPlugin;

pub struct ElasticTiebreak;

impl TaskOrderPlugin for ElasticTiebreak {
    fn name(&self) -> &str {
        "ElasticTiebreak"
    }

    fn compare(&self, a: &Pod, b: &Pod) -> Ordering {
        match (&a.subgroup, &b.subgroup) {
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            _ => b.uid.cmp(&a.uid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ResourceVector;

    #[test]
    fn root_subgroup_pod_outranks_sub_grouped_pod() {
        let plugin = ElasticTiebreak;
        let root_pod = Pod::new("p1", "pg1", ResourceVector::zero());
        let sub_pod = Pod::new("p2", "pg1", ResourceVector::zero()).with_subgroup("worker");
        assert_eq!(plugin.compare(&root_pod, &sub_pod), Ordering::Greater);
    }
}
