use super::report::print_export;
use super::sync::fund_progress;
use super::ui;
use crate::core::config::{AppConfig, ReportStage};
use crate::core::nav::NavProvider;
use crate::core::pipeline::run_pipeline;
use crate::core::store::NavStore;
use anyhow::Result;

/// The daily pipeline: sync, export, handoff and report stages.
pub async fn run(provider: &dyn NavProvider, store: &dyn NavStore, config: &AppConfig) -> Result<()> {
    ui::print_phase("INFO", "Running daily NAV pipeline");

    let pb = ui::new_progress_bar(config.funds.len() as u64);
    pb.set_message("Fetching latest NAV...");
    let on_fund = fund_progress(&pb);
    let on_stage = |stage: &ReportStage| {
        pb.finish_and_clear();
        ui::print_phase("RUNNING", &stage.name);
    };

    let result = run_pipeline(provider, store, config, &on_fund, &on_stage).await;
    pb.finish_and_clear();
    let report = result?;

    println!("{}", report.sync.display_as_table("Daily NAV update"));
    print_export(&report.export);
    ui::print_phase(
        "DONE",
        &format!("Pipeline completed, {} report stages run", report.stages_run),
    );
    Ok(())
}
