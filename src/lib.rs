pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::lock::RunLock;
use crate::core::nav::FetchMode;
use crate::providers::MfApiProvider;
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Sync { full: bool },
    Load,
    Export,
    Run,
}

impl AppCommand {
    /// Commands that write to the store hold the run lock.
    fn writes_store(&self) -> bool {
        !matches!(self, AppCommand::Export)
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("navsync starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    let location = config.store_location()?;
    debug!(
        funds = config.funds.len(),
        store = %store::location_label(&location),
        reports = config.reports.len(),
        "Loaded config"
    );

    let _lock = if command.writes_store() {
        Some(RunLock::acquire(&config.lock_file_path()?)?)
    } else {
        None
    };

    let store = store::open_store(&location).await?;
    let provider = MfApiProvider::new(&config.api_base_url, config.request_timeout())?;

    match command {
        AppCommand::Sync { full } => {
            let mode = if full {
                FetchMode::FullHistory
            } else {
                FetchMode::LatestOnly
            };
            cli::sync::run(&provider, store.as_ref(), &config, mode)
                .await
                .map(|_| ())
        }
        AppCommand::Load => cli::load::run(&provider, store.as_ref(), &config).await,
        AppCommand::Export => cli::export::run(store.as_ref(), &config).await.map(|_| ()),
        AppCommand::Run => cli::run::run(&provider, store.as_ref(), &config).await,
    }
}
