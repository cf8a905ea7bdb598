use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use common::ResourceVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueKind {
    Root,
    Department,
    Leaf,
}

/// A node in the queue tree (spec §3 "Queue"). Leaf queues hold pod groups;
/// departments hold other queues; there is exactly one root (empty parent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Queue {
    pub name: String,
    pub parent: Option<String>,
    pub kind: QueueKind,
    pub deserved: ResourceVector,
    pub limit: ResourceVector,
    /// Over-quota weight per resource axis, used to split capacity beyond
    /// `deserved` among sibling queues (spec §3, glossary "Over-quota
    /// weight").
    pub over_quota_weight: ResourceVector,
}

impl Queue {
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            kind: QueueKind::Root,
            deserved: ResourceVector::zero(),
            limit: ResourceVector::zero(),
            over_quota_weight: ResourceVector::new(1, 1, 1),
        }
    }

    pub fn leaf(
        name: impl Into<String>,
        parent: impl Into<String>,
        deserved: ResourceVector,
    ) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent.into()),
            kind: QueueKind::Leaf,
            deserved,
            limit: ResourceVector::new(i64::MAX, i64::MAX, i64::MAX),
            over_quota_weight: ResourceVector::new(1, 1, 1),
        }
    }

    pub fn department(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent.into()),
            kind: QueueKind::Department,
            deserved: ResourceVector::zero(),
            limit: ResourceVector::new(i64::MAX, i64::MAX, i64::MAX),
            over_quota_weight: ResourceVector::new(1, 1, 1),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueTreeError {
    #[error("queue tree has no root")]
    NoRoot,
    #[error("queue tree has more than one root: {0:?}")]
    MultipleRoots(Vec<String>),
    #[error("queue '{name}' references missing parent '{parent}'")]
    MissingParent { name: String, parent: String },
    #[error("queue '{0}' has leaf kind but is used as a parent")]
    LeafUsedAsParent(String),
}

/// Built once per session from the snapshot and immutable thereafter (spec
/// §3 "Queue", Lifecycle).
#[derive(Debug, Clone)]
pub struct QueueTree {
    queues: HashMap<String, Queue>,
    children: HashMap<String, Vec<String>>,
    root: String,
}

impl QueueTree {
    pub fn build(queues: Vec<Queue>) -> Result<Self, QueueTreeError> {
        let roots: Vec<String> = queues
            .iter()
            .filter(|q| q.parent.is_none())
            .map(|q| q.name.clone())
            .collect();
        let root = match roots.as_slice() {
            [] => return Err(QueueTreeError::NoRoot),
            [single] => single.clone(),
            many => return Err(QueueTreeError::MultipleRoots(many.to_vec())),
        };

        let by_name: HashMap<String, Queue> =
            queues.into_iter().map(|q| (q.name.clone(), q)).collect();

        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        for q in by_name.values() {
            if let Some(parent) = &q.parent {
                if !by_name.contains_key(parent) {
                    return Err(QueueTreeError::MissingParent {
                        name: q.name.clone(),
                        parent: parent.clone(),
                    });
                }
                if by_name[parent].kind == QueueKind::Leaf {
                    return Err(QueueTreeError::LeafUsedAsParent(parent.clone()));
                }
                children.entry(parent.clone()).or_default().push(q.name.clone());
            }
        }

        Ok(Self {
            queues: by_name,
            children,
            root,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Queue> {
        self.queues.get(name)
    }

    pub fn all(&self) -> impl Iterator<Item = &Queue> {
        self.queues.values()
    }

    pub fn children_of(&self, name: &str) -> &[String] {
        self.children.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn root_name(&self) -> &str {
        &self.root
    }

    pub fn is_leaf(&self, name: &str) -> bool {
        self.queues.get(name).is_some_and(|q| q.kind == QueueKind::Leaf)
    }

    pub fn parent_of(&self, name: &str) -> Option<&str> {
        self.queues.get(name).and_then(|q| q.parent.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_three_level_tree() {
        let tree = QueueTree::build(vec![
            Queue::root("root"),
            Queue::department("dept", "root"),
            Queue::leaf("q1", "dept", ResourceVector::new(100, 100, 8)),
        ])
        .unwrap();
        assert_eq!(tree.root_name(), "root");
        assert_eq!(tree.children_of("dept"), &["q1".to_string()]);
        assert!(tree.is_leaf("q1"));
    }

    #[test]
    fn rejects_missing_root() {
        let err = QueueTree::build(vec![Queue::leaf(
            "q1",
            "dept",
            ResourceVector::zero(),
        )])
        .unwrap_err();
        assert!(matches!(err, QueueTreeError::MissingParent { .. }));
    }

    #[test]
    fn rejects_multiple_roots() {
        let err =
            QueueTree::build(vec![Queue::root("root-a"), Queue::root("root-b")]).unwrap_err();
        assert!(matches!(err, QueueTreeError::MultipleRoots(_)));
    }

    #[test]
    fn rejects_leaf_used_as_parent() {
        let err = QueueTree::build(vec![
            Queue::root("root"),
            Queue::leaf("q1", "root", ResourceVector::zero()),
            Queue::leaf("q2", "q1", ResourceVector::zero()),
        ])
        .unwrap_err();
        assert_eq!(err, QueueTreeError::LeafUsedAsParent("q1".to_string()));
    }
}
