//! `Allocate` (spec §4.2): pure placement of pending jobs onto idle
//! resources, no victims.

use super::support;
use super::{Action, ActionReport};
use crate::model::{Node, PodGroup};
use crate::session::Session;

pub struct Allocate;

impl Action for Allocate {
    fn name(&self) -> &'static str {
        "Allocate"
    }

    fn intent_filter(&self, job: &PodGroup) -> bool {
        support::has_pending_demand(job)
    }

    fn execute(&self, session: &mut Session) -> ActionReport {
        let mut report = ActionReport {
            action: self.name(),
            ..Default::default()
        };

        let depth = session.config.depth_for(self.name());
        let mut orderer = support::preemptor_orderer(
            &session.snapshot,
            &mut session.job_order_cache,
            session.config.max_jobs_per_queue,
            &session.registry,
            |pg| self.intent_filter(pg),
        );

        let mut attempts = 0u32;
        while attempts < depth {
            let Some(job_uid) = orderer.pop_next_job() else {
                break;
            };
            attempts += 1;

            let Some(job) = session.snapshot.pod_group(&job_uid).cloned() else {
                continue;
            };
            let pending = support::pending_pods(&job_uid, &session.snapshot);
            if pending.is_empty() {
                continue;
            }

            let candidate_nodes: Vec<&Node> = support::feasible_nodes(&pending, &session.snapshot.nodes, &session.registry);
            let all_nodes: Vec<&Node> = session.snapshot.nodes.values().collect();

            let statement = support::attempt_placement(&job, &pending, &candidate_nodes, &all_nodes, &[], &session.snapshot, &session.registry);

            match statement {
                Some(statement) => match statement.commit(&mut session.snapshot) {
                    Ok(commit) => {
                        support::apply_bind_mutators(&mut session.snapshot, &session.registry, &job, &commit.allocated);
                        report.placed.push(job_uid.clone());
                        orderer.set_allocated(&job.queue, support::queue_allocated(&session.snapshot, &job.queue));
                    }
                    Err(e) => {
                        log::warn!("Allocate: commit failed for job {job_uid}: {e}");
                        report.failed.push(job_uid);
                    }
                },
                None => {
                    log::debug!("Allocate: job {job_uid} could not be placed on idle capacity");
                    report.failed.push(job_uid);
                }
            }
        }

        report
    }
}
