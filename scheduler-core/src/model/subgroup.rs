use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::topology::TopologyConstraint;
use common::Uid;

/// The name reserved for the synthetic DAG root (spec §3: "'default' is
/// reserved").
pub const RESERVED_ROOT_NAME: &str = "default";

/// Maximum sub-group DAG depth the validator will walk before giving up.
/// Spec §9 design notes: "Never recursion on user input beyond depth bound
/// (enforce a configurable maximum tree depth)."
pub const MAX_TREE_DEPTH: usize = 64;

/// A partition of a pod group's pods that may declare its own gang size and
/// topology constraint (spec §3 "Pod group", glossary "Sub-group / pod
/// set").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubGroup {
    pub name: String,
    pub min_available: u32,
    /// `None` means "parented directly under the synthetic root."
    pub parent: Option<String>,
    pub topology_constraint: Option<TopologyConstraint>,
    pub pod_uids: Vec<Uid>,
}

impl SubGroup {
    pub fn new(name: impl Into<String>, min_available: u32) -> Self {
        Self {
            name: name.into(),
            min_available,
            parent: None,
            topology_constraint: None,
            pod_uids: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_topology(mut self, constraint: TopologyConstraint) -> Self {
        self.topology_constraint = Some(constraint);
        self
    }
}

/// The exact categorical validation failures required by spec §8 testable
/// property 5. Each variant names one violated invariant from spec §3:
/// "sub-group names unique, min-available ≥ 1, parent references resolve,
/// no cycles (including self-loops), 'default' is reserved."
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubGroupError {
    #[error("sub-group name must not be empty")]
    EmptyName,
    #[error("sub-group name '{0}' is reserved")]
    ReservedName(String),
    #[error("duplicate sub-group name '{0}'")]
    DuplicateName(String),
    #[error("sub-group '{0}' has non-positive min-available {1}")]
    NonPositiveMinAvailable(String, i64),
    #[error("sub-group '{name}' references missing parent '{parent}'")]
    MissingParent { name: String, parent: String },
    #[error("sub-group DAG contains a cycle reachable from '{0}'")]
    Cycle(String),
    #[error("sub-group DAG exceeds the maximum depth of {0}")]
    DepthExceeded(usize),
}

/// Validates a flat list of sub-groups as a DAG rooted under the synthetic
/// root. Two passes, per spec §9 design notes: (1) duplicate-name and
/// per-field checks, (2) parent resolution and cycle detection via DFS with
/// an explicit recursion stack, bounded by `MAX_TREE_DEPTH`.
pub fn validate_subgroups(subgroups: &[SubGroup]) -> Result<(), SubGroupError> {
    let mut seen = HashSet::new();
    let mut by_name: HashMap<&str, &SubGroup> = HashMap::new();

    for sg in subgroups {
        if sg.name.is_empty() {
            return Err(SubGroupError::EmptyName);
        }
        if sg.name == RESERVED_ROOT_NAME {
            return Err(SubGroupError::ReservedName(sg.name.clone()));
        }
        if !seen.insert(sg.name.as_str()) {
            return Err(SubGroupError::DuplicateName(sg.name.clone()));
        }
        if sg.min_available < 1 {
            return Err(SubGroupError::NonPositiveMinAvailable(
                sg.name.clone(),
                sg.min_available as i64,
            ));
        }
        by_name.insert(sg.name.as_str(), sg);
    }

    for sg in subgroups {
        if let Some(parent) = &sg.parent
            && parent != RESERVED_ROOT_NAME
            && !by_name.contains_key(parent.as_str())
        {
            return Err(SubGroupError::MissingParent {
                name: sg.name.clone(),
                parent: parent.clone(),
            });
        }
    }

    for sg in subgroups {
        let mut stack = Vec::new();
        detect_cycle(sg.name.as_str(), &by_name, &mut stack, 0)?;
    }

    Ok(())
}

fn detect_cycle<'a>(
    name: &'a str,
    by_name: &HashMap<&'a str, &'a SubGroup>,
    stack: &mut Vec<&'a str>,
    depth: usize,
) -> Result<(), SubGroupError> {
    if depth > MAX_TREE_DEPTH {
        return Err(SubGroupError::DepthExceeded(MAX_TREE_DEPTH));
    }
    if stack.contains(&name) {
        return Err(SubGroupError::Cycle(name.to_string()));
    }
    stack.push(name);
    if let Some(sg) = by_name.get(name)
        && let Some(parent) = &sg.parent
        && parent != RESERVED_ROOT_NAME
    {
        detect_cycle(parent.as_str(), by_name, stack, depth + 1)?;
    }
    stack.pop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_valid_dag() {
        let groups = vec![
            SubGroup::new("leader", 1),
            SubGroup::new("worker", 4).with_parent("leader"),
        ];
        assert!(validate_subgroups(&groups).is_ok());
    }

    #[test]
    fn rejects_duplicate_names() {
        let groups = vec![SubGroup::new("a", 1), SubGroup::new("a", 2)];
        assert_eq!(
            validate_subgroups(&groups),
            Err(SubGroupError::DuplicateName("a".to_string()))
        );
    }

    #[test]
    fn rejects_missing_parent() {
        let groups = vec![SubGroup::new("a", 1).with_parent("ghost")];
        assert_eq!(
            validate_subgroups(&groups),
            Err(SubGroupError::MissingParent {
                name: "a".to_string(),
                parent: "ghost".to_string(),
            })
        );
    }

    #[test]
    fn rejects_self_loop_cycle() {
        let groups = vec![SubGroup::new("a", 1).with_parent("a")];
        assert_eq!(
            validate_subgroups(&groups),
            Err(SubGroupError::Cycle("a".to_string()))
        );
    }

    #[test]
    fn rejects_longer_cycle() {
        let groups = vec![
            SubGroup::new("a", 1).with_parent("b"),
            SubGroup::new("b", 1).with_parent("a"),
        ];
        assert!(matches!(
            validate_subgroups(&groups),
            Err(SubGroupError::Cycle(_))
        ));
    }

    #[test]
    fn rejects_empty_name() {
        let groups = vec![SubGroup::new("", 1)];
        assert_eq!(validate_subgroups(&groups), Err(SubGroupError::EmptyName));
    }

    #[test]
    fn rejects_reserved_name() {
        let groups = vec![SubGroup::new("default", 1)];
        assert_eq!(
            validate_subgroups(&groups),
            Err(SubGroupError::ReservedName("default".to_string()))
        );
    }

    #[test]
    fn rejects_non_positive_min_available() {
        let groups = vec![SubGroup::new("a", 0)];
        assert_eq!(
            validate_subgroups(&groups),
            Err(SubGroupError::NonPositiveMinAvailable("a".to_string(), 0))
        );
    }
}
