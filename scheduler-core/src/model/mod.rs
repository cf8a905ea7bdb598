//! The per-session data model (spec §3): pod groups, sub-groups, pods,
//! nodes, queues and scheduling conditions. Every type here is immutable
//! input for the duration of one session except where the statement machine
//! (`crate::statement`) stages overlay diffs on top of it.

pub mod condition;
pub mod node;
pub mod pod;
pub mod pod_group;
pub mod queue;
pub mod subgroup;
pub mod topology;

pub use condition::SchedulingCondition;
pub use node::{GpuSharingState, Node, PerGpuShare};
pub use pod::{Pod, PodStatus};
pub use pod_group::{PodGroup, Preemptibility};
pub use queue::{Queue, QueueKind, QueueTree};
pub use subgroup::{validate_subgroups, SubGroup, SubGroupError};
pub use topology::TopologyConstraint;
