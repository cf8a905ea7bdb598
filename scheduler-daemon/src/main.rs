mod cli;
mod config;
mod snapshot_source;
mod status_writer;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};

use scheduler_core::model::PodGroup;
use scheduler_core::plugins::Registry;
use scheduler_core::session::Session;
use scheduler_core::snapshot::Snapshot;
use scheduler_core::status::conditions::{mark_schedulable, mark_unschedulable};
use scheduler_core::status::StatusUpdater;

use cli::{Cli, Commands};
use config::load_config;
use snapshot_source::YamlFileSource;
use status_writer::LoggingStatusWriter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Start { config: config_path } => {
            let path = config_path.to_str().context("config path is not valid UTF-8")?;
            let cfg = load_config(path)?;
            run(cfg).await
        }
    }
}

async fn run(cfg: config::Config) -> anyhow::Result<()> {
    info!("scheduler-daemon starting, tick interval {:?}", cfg.tick_interval);

    let source = YamlFileSource::new(cfg.snapshot_source.clone());
    let snapshot = Snapshot::load(&source).context("failed to load initial snapshot")?;
    let registry = Registry::default();
    let core_config = cfg.core_config();

    let mut session = Session::new(snapshot, registry, core_config.clone());

    let status_updater = StatusUpdater::spawn(
        Arc::new(LoggingStatusWriter),
        core_config.status_updater_workers,
        core_config.status_updater_backoff,
    );

    let mut tick = tokio::time::interval(cfg.tick_interval);
    loop {
        tick.tick().await;

        if let Err(e) = session.refresh(&source) {
            warn!("snapshot refresh failed, retrying next tick: {e:#}");
            continue;
        }

        let reports = session.run_pipeline();
        for report in &reports {
            if report.placed.is_empty() && report.failed.is_empty() {
                continue;
            }
            info!(
                "{}: placed {} job(s), failed {} job(s), evicted {} pod(s)",
                report.action,
                report.placed.len(),
                report.failed.len(),
                report.evicted.len()
            );
        }

        publish_conditions(&mut session, &reports, &status_updater).await;
    }
}

async fn publish_conditions(
    session: &mut Session,
    reports: &[scheduler_core::actions::ActionReport],
    status_updater: &StatusUpdater,
) {
    for report in reports {
        for uid in &report.placed {
            if let Some(pg) = session.snapshot.pod_group_mut(uid) {
                mark_schedulable(&mut pg.conditions, &pg.queue);
            }
        }
        for uid in &report.failed {
            if let Some(pg) = session.snapshot.pod_group_mut(uid) {
                mark_unschedulable(&mut pg.conditions, &pg.queue, report.action, "no feasible placement this cycle");
            }
        }
    }

    let touched: Vec<&PodGroup> = reports
        .iter()
        .flat_map(|r| r.placed.iter().chain(r.failed.iter()))
        .filter_map(|uid| session.snapshot.pod_group(uid))
        .collect();

    for pg in touched {
        status_updater.enqueue(pg.uid.clone(), pg.conditions.clone()).await;
    }
}
