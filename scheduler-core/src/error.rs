//! Error taxonomy (spec §7). Non-fatal categories are recorded and the
//! session proceeds; only initialization/snapshot errors are fatal.

use common::Uid;
use thiserror::Error;

use crate::model::queue::QueueTreeError;
use crate::model::subgroup::SubGroupError;

#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Sub-group DAG invalid, queue missing parent, etc. Objects failing
    /// validation are silently skipped from ordering, not surfaced as a
    /// session failure (spec §7).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// API read failures while building the snapshot. Fails the whole
    /// session; retried on the next tick; no partial state is committed.
    #[error("snapshot error: {0}")]
    Snapshot(#[source] anyhow::Error),

    /// Expected outcome of the scenario solver failing to place a job.
    /// Recorded as the queue's "smallest failed representative"; no
    /// cluster-visible effect.
    #[error("job {job} could not be scheduled: {reason}")]
    ScenarioFailed { job: Uid, reason: String },

    /// A staged statement could not be committed; discarded in LIFO order,
    /// session proceeds to the next job.
    #[error("statement commit failed: {0}")]
    StatementCommit(String),

    /// Status-updater write failure; re-enqueued with backoff, never
    /// blocks scheduling decisions.
    #[error("status write failed for {key}: {source}")]
    StatusWrite {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Unknown sub-group types or unknown startup policies bubbling up
    /// from the (out-of-scope) controller collaborator; such pod groups
    /// are treated as ineligible.
    #[error("unknown policy for pod group {0}")]
    UnknownPolicy(Uid),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error(transparent)]
    SubGroup(#[from] SubGroupError),
    #[error(transparent)]
    QueueTree(#[from] QueueTreeError),
    #[error("pod group {0} references a queue that is not a leaf")]
    QueueNotLeaf(Uid),
    #[error("pod group {0} references an orphan queue '{1}'")]
    OrphanQueue(Uid, String),
}
