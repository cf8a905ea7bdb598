//! Predicate + scorer capability, grounded on the teacher's
//! `plugins::taint_toleration::TaintToleration`, unchanged in spirit: a
//! `NoSchedule`/`NoExecute` taint without a matching toleration excludes
//! the node outright; a `PreferNoSchedule` taint only costs score.

use crate::model::node::TaintEffect;
use crate::model::{Node, Pod};
use crate::plugins::{PredicatePlugin, ScorerPlugin};

pub struct TaintToleration;

fn tolerated(pod: &Pod, taint: &crate::model::node::Taint) -> bool {
    pod.tolerations.iter().any(|t| t.tolerates(taint))
}

impl PredicatePlugin for TaintToleration {
    fn name(&self) -> &str {
        "TaintToleration"
    }

    fn fits(&self, pod: &Pod, node: &Node) -> bool {
        node.taints.iter().all(|taint| {
            !matches!(taint.effect, TaintEffect::NoSchedule | TaintEffect::NoExecute)
                || tolerated(pod, taint)
        })
    }
}

impl ScorerPlugin for TaintToleration {
    fn name(&self) -> &str {
        "TaintToleration"
    }

    fn score(&self, pod: &Pod, node: &Node) -> i64 {
        let intolerable_preferred = node
            .taints
            .iter()
            .filter(|t| matches!(t.effect, TaintEffect::PreferNoSchedule) && !tolerated(pod, t))
            .count();
        100 - (intolerable_preferred as i64) * 20
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::{Taint, TaintEffect, Toleration, TolerationOperator};
    use common::ResourceVector;

    #[test]
    fn untolerated_no_schedule_taint_excludes_node() {
        let mut node = Node::new("n1", ResourceVector::zero());
        node.taints.push(Taint {
            key: "gpu".into(),
            value: "broken".into(),
            effect: TaintEffect::NoSchedule,
        });
        let pod = Pod::new("p1", "pg1", ResourceVector::zero());
        assert!(!TaintToleration.fits(&pod, &node));
    }

    #[test]
    fn matching_toleration_allows_node() {
        let mut node = Node::new("n1", ResourceVector::zero());
        node.taints.push(Taint {
            key: "gpu".into(),
            value: "broken".into(),
            effect: TaintEffect::NoSchedule,
        });
        let mut pod = Pod::new("p1", "pg1", ResourceVector::zero());
        pod.tolerations.push(Toleration {
            key: Some("gpu".into()),
            operator: TolerationOperator::Equal,
            value: "broken".into(),
            effect: Some(TaintEffect::NoSchedule),
        });
        assert!(TaintToleration.fits(&pod, &node));
    }
}
