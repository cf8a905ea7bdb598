//! `StaleGangEviction` (spec §4.2): pod groups that have sat with
//! unconfirmed `Pipelined` pods for more than `stale_pipeline_cycles`
//! consecutive sessions are rolled back, freeing the gang-held resources
//! for other jobs. Counts live on `Session::pipelined_ticks`, since a gang
//! going stale spans several sessions, not one (spec §4.2 gang commit
//! atomicity).

use std::collections::HashMap;

use super::support;
use super::{Action, ActionReport};
use crate::model::{PodGroup, PodStatus};
use crate::session::Session;
use crate::statement::Statement;

pub struct StaleGangEviction;

impl Action for StaleGangEviction {
    fn name(&self) -> &'static str {
        "StaleGangEviction"
    }

    fn intent_filter(&self, _job: &PodGroup) -> bool {
        // Scope is decided against pipelined-pod presence in `execute`, not
        // pending demand like the other four actions.
        true
    }

    fn execute(&self, session: &mut Session) -> ActionReport {
        let mut report = ActionReport {
            action: self.name(),
            ..Default::default()
        };

        let threshold = session.config.stale_pipeline_cycles;
        let pod_group_uids: Vec<_> = session.snapshot.pod_groups.keys().cloned().collect();
        let mut next_ticks = HashMap::new();

        for job_uid in pod_group_uids {
            let has_pipelined = session
                .snapshot
                .pods_of(&job_uid)
                .any(|p| p.status == PodStatus::Pipelined);
            if !has_pipelined {
                continue;
            }

            let ticks = session.pipelined_ticks.get(&job_uid).copied().unwrap_or(0) + 1;
            if ticks < threshold {
                next_ticks.insert(job_uid, ticks);
                continue;
            }

            let victims = support::victim_pods(&job_uid, &session.snapshot);
            let mut statement = Statement::new(&session.snapshot);
            let mut staged = true;
            for victim in &victims {
                if let Err(e) = statement.evict(&victim.uid, victim.resources) {
                    log::warn!("StaleGangEviction: failed to stage eviction for {job_uid}: {e}");
                    staged = false;
                    break;
                }
            }

            if !staged {
                report.failed.push(job_uid);
                continue;
            }

            match statement.commit(&mut session.snapshot) {
                Ok(commit) => {
                    log::info!("StaleGangEviction: rolled back stale gang {job_uid} after {ticks} pipelined cycles");
                    report.evicted.extend(commit.evicted);
                }
                Err(e) => {
                    log::warn!("StaleGangEviction: commit failed for job {job_uid}: {e}");
                    report.failed.push(job_uid);
                }
            }
        }

        session.pipelined_ticks = next_ticks;
        report
    }
}
