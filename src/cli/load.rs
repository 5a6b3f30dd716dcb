use super::sync::fund_progress;
use super::{export, ui};
use crate::core::config::AppConfig;
use crate::core::load::reload_all;
use crate::core::nav::NavProvider;
use crate::core::store::NavStore;
use anyhow::Result;

/// Full reload followed by a fresh master table export.
pub async fn run(provider: &dyn NavProvider, store: &dyn NavStore, config: &AppConfig) -> Result<()> {
    ui::print_phase(
        "WARN",
        "Full reload: every stored NAV record is deleted before loading history",
    );

    let pb = ui::new_progress_bar(config.funds.len() as u64);
    pb.set_message("Loading NAV history...");
    let report = reload_all(provider, store, &config.funds, &fund_progress(&pb)).await;
    pb.finish_and_clear();
    let report = report?;

    println!("{}", report.display_as_table("Historical NAV load"));
    export::run(store, config).await?;
    ui::print_phase("DONE", "All funds loaded");
    Ok(())
}
