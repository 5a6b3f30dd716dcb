use super::ui;
use crate::core::config::AppConfig;
use crate::core::nav::{FetchMode, Fund, NavProvider};
use crate::core::store::NavStore;
use crate::core::sync::{SyncReport, sync_all};
use anyhow::Result;

/// Progress callback that advances `pb` and shows the fund just processed.
pub(crate) fn fund_progress(pb: &indicatif::ProgressBar) -> impl Fn(&Fund) + Sync + '_ {
    move |fund: &Fund| {
        pb.set_message(fund.name.clone());
        pb.inc(1);
    }
}

pub async fn run(
    provider: &dyn NavProvider,
    store: &dyn NavStore,
    config: &AppConfig,
    mode: FetchMode,
) -> Result<SyncReport> {
    ui::print_phase("INFO", &format!("Fetching {mode} NAV for {} funds", config.funds.len()));

    let pb = ui::new_progress_bar(config.funds.len() as u64);
    pb.set_message("Fetching NAV...");
    let report = sync_all(provider, store, &config.funds, mode, &fund_progress(&pb)).await;
    pb.finish_and_clear();

    println!("{}", report.display_as_table("Daily NAV update"));
    Ok(report)
}
