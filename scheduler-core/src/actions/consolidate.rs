//! `Consolidate` (spec §4.2): defragmentation — re-pack a job's own
//! `Pipelined` pods onto fewer nodes. Grounded on the same solver/statement
//! plumbing every other action uses: the job's current pipelined pods are
//! both the pending workload (being re-placed) and the victims (their own
//! current placement is evicted first so the capacity is free to retry a
//! tighter layout), staged onto one atomic statement.

use std::collections::HashSet;

use super::support;
use super::{Action, ActionReport};
use crate::model::{Node, Pod, PodGroup, PodStatus};
use crate::session::Session;

pub struct Consolidate;

impl Consolidate {
    /// Distinct nodes a job's pipelined pods currently occupy.
    fn current_spread(pods: &[Pod]) -> HashSet<&str> {
        pods.iter().filter_map(|p| p.node_name.as_deref()).collect()
    }
}

impl Action for Consolidate {
    fn name(&self) -> &'static str {
        "Consolidate"
    }

    fn intent_filter(&self, _job: &PodGroup) -> bool {
        // Consolidate targets already-pipelined gangs, not pending demand;
        // scope is decided in `execute` against the pods themselves.
        true
    }

    fn execute(&self, session: &mut Session) -> ActionReport {
        let mut report = ActionReport {
            action: self.name(),
            ..Default::default()
        };

        let depth = session.config.depth_for(self.name());
        let pod_group_uids: Vec<_> = session.snapshot.pod_groups.keys().cloned().collect();

        let mut attempts = 0u32;
        for job_uid in pod_group_uids {
            if attempts >= depth {
                break;
            }

            let pipelined: Vec<Pod> = session
                .snapshot
                .pods_of(&job_uid)
                .filter(|p| p.status == PodStatus::Pipelined)
                .cloned()
                .collect();

            let spread = Self::current_spread(&pipelined);
            if spread.len() < 2 {
                continue;
            }
            let Some(job) = session.snapshot.pod_group(&job_uid).cloned() else {
                continue;
            };
            attempts += 1;

            let victim_credit = support::credit_by_node(&pipelined);
            let mut ranked: Vec<&Node> =
                support::feasible_nodes_with_credit(&pipelined, &session.snapshot.nodes, &session.registry, &victim_credit);
            ranked.sort_by(|a, b| {
                b.idle
                    .dominant_share(&b.allocatable)
                    .partial_cmp(&a.idle.dominant_share(&a.allocatable))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let all_nodes: Vec<&Node> = session.snapshot.nodes.values().collect();

            let mut found = None;
            for k in 1..spread.len() {
                let candidates: Vec<&Node> = ranked.iter().take(k).copied().collect();
                if candidates.is_empty() {
                    continue;
                }
                if let Some(statement) = support::attempt_placement(
                    &job,
                    &pipelined,
                    &candidates,
                    &all_nodes,
                    &pipelined,
                    &session.snapshot,
                    &session.registry,
                ) {
                    found = Some(statement);
                    break;
                }
            }

            match found {
                Some(statement) => match statement.commit(&mut session.snapshot) {
                    Ok(commit) => {
                        support::apply_bind_mutators(&mut session.snapshot, &session.registry, &job, &commit.allocated);
                        report.placed.push(job_uid.clone());
                        report.evicted.extend(commit.evicted);
                    }
                    Err(e) => {
                        log::warn!("Consolidate: commit failed for job {job_uid}: {e}");
                        report.failed.push(job_uid);
                    }
                },
                None => {
                    log::debug!("Consolidate: job {job_uid} has no tighter layout than its current one");
                }
            }
        }

        report
    }
}
