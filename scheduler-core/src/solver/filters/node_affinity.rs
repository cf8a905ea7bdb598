//! Node-affinity accumulated filter (spec §4.4). Victims expand the
//! feasible set with the nodes they currently occupy, so a preemptor whose
//! only matching node is pinned by a lower-priority gang can still be
//! scheduled once that gang is named as a victim.

use std::collections::HashSet;

use common::Uid;

use crate::model::{Node, Pod};

pub struct NodeAffinityFilter {
    feasible: HashSet<String>,
    processed_victims: HashSet<Uid>,
}

impl NodeAffinityFilter {
    pub fn new(feasible: impl IntoIterator<Item = String>) -> Self {
        Self {
            feasible: feasible.into_iter().collect(),
            processed_victims: HashSet::new(),
        }
    }

    /// Adds `victim`'s node to the feasible set, once per victim.
    pub fn note_victim(&mut self, victim: &Pod) {
        if !self.processed_victims.insert(victim.uid.clone()) {
            return;
        }
        if let Some(node_name) = &victim.node_name {
            self.feasible.insert(node_name.clone());
        }
    }

    /// True iff `pod` can run on at least one node in the (possibly
    /// victim-expanded) feasible set. `all_nodes` is the whole cluster, used
    /// only to resolve `required_node_names` existence (spec §4.4:
    /// "`matchFields` against `metadata.name` is evaluated against all
    /// cluster nodes; the filter fails only if the target node doesn't exist
    /// in the cluster at all").
    pub fn filter(&self, pod: &Pod, all_nodes: &[&Node]) -> bool {
        if !pod.has_affinity_requirements() {
            return true;
        }
        if !pod.node_affinity.required_node_names.is_empty() {
            let target_exists = pod
                .node_affinity
                .required_node_names
                .iter()
                .any(|name| all_nodes.iter().any(|node| &node.name == name));
            if !target_exists {
                return false;
            }
            if pod.node_affinity.node_selector.is_empty() && pod.node_affinity.required_match_expressions.is_empty() {
                return true;
            }
        }
        all_nodes
            .iter()
            .filter(|node| self.feasible.contains(&node.name))
            .any(|node| Self::node_matches(pod, node))
    }

    pub(crate) fn node_matches(pod: &Pod, node: &Node) -> bool {
        for (key, value) in &pod.node_affinity.node_selector {
            if node.labels.get(key) != Some(value) {
                return false;
            }
        }
        for expr in &pod.node_affinity.required_match_expressions {
            if !expr.matches(node.labels.get(&expr.key)) {
                return false;
            }
        }
        if !pod.node_affinity.required_node_names.is_empty()
            && !pod.node_affinity.required_node_names.contains(&node.name)
        {
            return false;
        }
        true
    }
}
