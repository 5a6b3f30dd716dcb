//! Daily pipeline: sync, export, handoff, then external report stages
//!
//! Stages run strictly one after another. A failing fund only shows up in the
//! sync report, while a failing stage ends the run.

use crate::core::config::{AppConfig, HandoffConfig, ProbeCommand, ReportStage};
use crate::core::export::{ExportSummary, export_master_table, snapshot_rows};
use crate::core::nav::{FetchMode, Fund, NavProvider};
use crate::core::store::NavStore;
use crate::core::sync::{SyncReport, sync_all};
use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub sync: SyncReport,
    pub export: ExportSummary,
    pub stages_run: usize,
}

/// Runs the probe once. A probe still running at `deadline` is killed and
/// counts as not ready.
async fn probe_succeeds(probe: &ProbeCommand, deadline: Instant) -> bool {
    let mut command = Command::new(&probe.program);
    command
        .args(&probe.args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    match timeout_at(deadline, command.status()).await {
        Ok(Ok(status)) => status.success(),
        Ok(Err(e)) => {
            debug!("Readiness probe '{}' could not start: {}", probe.program, e);
            false
        }
        Err(_) => {
            debug!("Readiness probe '{}' still running at the deadline", probe.program);
            false
        }
    }
}

/// Waits until every snapshot holds `expected_rows` rows and the optional
/// probe command succeeds.
pub async fn wait_for_handoff(
    targets: &[&Path],
    expected_rows: usize,
    handoff: &HandoffConfig,
) -> Result<()> {
    let deadline = Instant::now() + handoff.timeout();
    loop {
        let snapshots_ready = targets
            .iter()
            .all(|path| snapshot_rows(path) == Some(expected_rows));
        let probe_ready = match &handoff.probe {
            Some(probe) => snapshots_ready && probe_succeeds(probe, deadline).await,
            None => true,
        };

        if snapshots_ready && probe_ready {
            info!(rows = expected_rows, "Snapshot ready for reporting");
            return Ok(());
        }
        let now = Instant::now();
        if now >= deadline {
            bail!(
                "Snapshot was not ready for reporting after {}s",
                handoff.timeout_secs
            );
        }
        debug!(
            snapshots_ready,
            probe_ready, "Waiting for snapshot to become ready"
        );
        sleep(handoff.poll_interval().min(deadline - now)).await;
    }
}

pub async fn run_report_stage(stage: &ReportStage) -> Result<()> {
    info!(stage = %stage.name, program = %stage.program, "Running report stage");
    let status = Command::new(&stage.program)
        .args(&stage.args)
        .status()
        .await
        .with_context(|| format!("Failed to start report stage '{}'", stage.name))?;

    if !status.success() {
        bail!("Report stage '{}' failed with {}", stage.name, status);
    }
    Ok(())
}

/// Runs stages in order and stops at the first failure.
pub async fn run_report_stages(
    stages: &[ReportStage],
    on_stage: &(dyn Fn(&ReportStage) + Sync),
) -> Result<usize> {
    for stage in stages {
        on_stage(stage);
        run_report_stage(stage).await?;
    }
    Ok(stages.len())
}

pub async fn run_pipeline(
    provider: &dyn NavProvider,
    store: &dyn NavStore,
    config: &AppConfig,
    on_fund: &(dyn Fn(&Fund) + Sync),
    on_stage: &(dyn Fn(&ReportStage) + Sync),
) -> Result<PipelineReport> {
    info!("Running NAV sync");
    let sync = sync_all(
        provider,
        store,
        &config.funds,
        FetchMode::LatestOnly,
        on_fund,
    )
    .await;

    let raw = Path::new(&config.raw_export_path);
    let processed = Path::new(&config.processed_export_path);
    let targets = [raw, processed];
    let export = export_master_table(store, &targets).await?;

    wait_for_handoff(&targets, export.rows, &config.handoff).await?;

    let stages_run = run_report_stages(&config.reports, on_stage).await?;
    info!(stages_run, "Pipeline completed");

    Ok(PipelineReport {
        sync,
        export,
        stages_run,
    })
}
