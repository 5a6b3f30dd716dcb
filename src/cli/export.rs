use super::report::print_export;
use crate::core::config::AppConfig;
use crate::core::export::{ExportSummary, export_master_table};
use crate::core::store::NavStore;
use anyhow::Result;
use std::path::Path;

pub async fn run(store: &dyn NavStore, config: &AppConfig) -> Result<ExportSummary> {
    let targets = [
        Path::new(&config.raw_export_path),
        Path::new(&config.processed_export_path),
    ];
    let summary = export_master_table(store, &targets).await?;
    print_export(&summary);
    Ok(summary)
}
