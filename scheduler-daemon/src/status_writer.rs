//! `StatusWriter` implementation (spec §1 Non-goals: the outward-facing API
//! server that actually persists pod-group status is out of scope). This
//! logs the patch instead of writing it anywhere, standing in for the real
//! binder/API write the same way `scheduler_core::status::StatusWriter` is
//! documented as an interface-only seam.

use common::Uid;
use scheduler_core::model::SchedulingCondition;
use scheduler_core::status::StatusWriter;

pub struct LoggingStatusWriter;

impl StatusWriter for LoggingStatusWriter {
    fn write_conditions(&self, pod_group: &Uid, conditions: &[SchedulingCondition]) -> anyhow::Result<()> {
        for condition in conditions {
            log::info!(
                "pod group {pod_group}: {} {} ({}): {}",
                condition.condition_type,
                condition.status,
                condition.reason,
                condition.message
            );
        }
        Ok(())
    }
}
