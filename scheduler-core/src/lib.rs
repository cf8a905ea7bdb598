//! Gang-aware, hierarchical fair-share scheduling engine.
//!
//! A session loads an immutable [`snapshot::Snapshot`] of pod groups, nodes
//! and queues, orders pending jobs with [`ordering::JobOrderer`], runs the
//! action pipeline (`actions`) against a [`solver`] to find placements, and
//! stages the result through the [`statement`] machine before committing.

pub mod actions;
pub mod config;
pub mod cycle_state;
pub mod error;
pub mod fingerprint;
pub mod model;
pub mod ordering;
pub mod plugins;
pub mod session;
pub mod snapshot;
pub mod solver;
pub mod statement;
pub mod status;

pub use error::{SchedulerError, ValidationError};
pub use session::Session;
pub use snapshot::{Snapshot, SnapshotSource};
pub use statement::{CommitReport, Statement, StatementError};
