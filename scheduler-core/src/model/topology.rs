use serde::{Deserialize, Serialize};

/// A topology constraint binds a pod group or sub-group to a tree of
/// topology levels (e.g. rack, zone) within which its pods must be
/// co-placed (spec §3, glossary "Topology constraint").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyConstraint {
    pub tree_id: String,
    /// Level at which placement is mandatory; the scenario solver's
    /// topology-aware idle-GPU filter (spec §4.4) groups nodes into domains
    /// keyed by this level.
    pub required_level: Option<String>,
    /// Level used only for scoring/preference, never for hard filtering.
    pub preferred_level: Option<String>,
}

impl TopologyConstraint {
    pub fn new(tree_id: impl Into<String>) -> Self {
        Self {
            tree_id: tree_id.into(),
            required_level: None,
            preferred_level: None,
        }
    }

    pub fn with_required_level(mut self, level: impl Into<String>) -> Self {
        self.required_level = Some(level.into());
        self
    }

    pub fn with_preferred_level(mut self, level: impl Into<String>) -> Self {
        self.preferred_level = Some(level.into());
        self
    }
}
