//! `Preempt` (spec §4.2): victims restricted to the *same* queue, strictly
//! lower priority than the preemptor, never the preemptor itself. Victims
//! accumulate job-by-job exactly as `Reclaim` does, but the victim source is
//! scoped to one queue rather than "over deserved share" elsewhere.

use super::support;
use super::{Action, ActionReport};
use crate::model::{Node, Pod, PodGroup};
use crate::session::Session;

pub struct Preempt;

impl Action for Preempt {
    fn name(&self) -> &'static str {
        "Preempt"
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

            let victim_eligible =
                |pg: &PodGroup| pg.queue == job.queue && pg.uid != job.uid && pg.priority < job.priority && session.registry.victim_eligible(&job, pg);
            let victim_pool: Vec<Pod> = session
                .snapshot
                .pod_groups
                .values()
                .filter(|pg| !pg.allocated.is_zero() && victim_eligible(pg))
                .flat_map(|pg| support::victim_pods(&pg.uid, &session.snapshot))
                .collect();
            let victim_credit = support::credit_by_node(&victim_pool);
            let candidate_nodes: Vec<&Node> =
                support::feasible_nodes_with_credit(&pending, &session.snapshot.nodes, &session.registry, &victim_credit);
            let all_nodes: Vec<&Node> = session.snapshot.nodes.values().collect();

            let mut victim_source = support::victim_orderer(
                &session.snapshot,
                &mut session.job_order_cache,
                session.config.max_jobs_per_queue,
                &session.registry,
                victim_eligible,
            );

            let mut victims: Vec<Pod> = Vec::new();
            let statement = loop {
                if let Some(statement) = support::attempt_placement(
                    &job,
                    &pending,
                    &candidate_nodes,
                    &all_nodes,
                    &victims,
                    &session.snapshot,
                    &session.registry,
                ) {
                    break Some(statement);
                }
                let Some(victim_uid) = victim_source.pop_next_job() else {
                    break None;
                };
                victims.extend(support::victim_pods(&victim_uid, &session.snapshot));
            };

            match statement {
                Some(statement) => match statement.commit(&mut session.snapshot) {
                    Ok(commit) => {
                        support::apply_bind_mutators(&mut session.snapshot, &session.registry, &job, &commit.allocated);
                        report.placed.push(job_uid.clone());
                        report.evicted.extend(commit.evicted);
                        orderer.set_allocated(&job.queue, support::queue_allocated(&session.snapshot, &job.queue));
                    }
                    Err(e) => {
                        log::warn!("Preempt: commit failed for job {job_uid}: {e}");
                        report.failed.push(job_uid);
                    }
                },
                None => {
                    log::debug!("Preempt: job {job_uid} could not be placed even against lower-priority victims");
                    report.failed.push(job_uid);
                }
            }
        }

        report
    }
}
