use crate::core::nav::Fund;
use crate::store::StoreLocation;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

/// Overrides `db_connection`, so credentials can stay out of the config file.
pub const DB_CONNECTION_ENV: &str = "NAVSYNC_DB_CONNECTION";

fn default_api_base_url() -> String {
    "https://api.mfapi.in".to_string()
}

/// An external report stage, run as `program args...` after ingestion.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ReportStage {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Command polled until it exits successfully.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ProbeCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HandoffConfig {
    #[serde(default = "HandoffConfig::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "HandoffConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub probe: Option<ProbeCommand>,
}

impl HandoffConfig {
    fn default_poll_interval_ms() -> u64 {
        500
    }

    fn default_timeout_secs() -> u64 {
        30
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HandoffConfig {
    fn default() -> Self {
        HandoffConfig {
            poll_interval_ms: Self::default_poll_interval_ms(),
            timeout_secs: Self::default_timeout_secs(),
            probe: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    pub db_connection: String,
    pub raw_export_path: String,
    pub processed_export_path: String,
    pub funds: Vec<Fund>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub data_path: Option<String>,
    #[serde(default)]
    pub lock_path: Option<String>,
    #[serde(default)]
    pub handoff: HandoffConfig,
    #[serde(default)]
    pub reports: Vec<ReportStage>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "navsync", "navsync")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("in", "navsync", "navsync")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn lock_file_path(&self) -> Result<PathBuf> {
        match &self.lock_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(self.default_data_path()?.join("navsync.lock")),
        }
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Applies overrides from the process environment (or any lookup).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(connection) = lookup(DB_CONNECTION_ENV).filter(|c| !c.trim().is_empty()) {
            debug!("Using db_connection from {}", DB_CONNECTION_ENV);
            self.db_connection = connection;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.funds.is_empty() {
            bail!("No funds configured");
        }

        let mut names = HashSet::new();
        for fund in &self.funds {
            if fund.name.trim().is_empty() {
                bail!("Fund with scheme code {} has an empty name", fund.scheme_code);
            }
            if fund.name.contains('\0') {
                bail!("Fund name '{}' contains a NUL character", fund.name);
            }
            if fund.scheme_code == 0 {
                bail!("Fund '{}' has no scheme code", fund.name);
            }
            if !names.insert(fund.name.as_str()) {
                bail!("Duplicate fund name '{}'", fund.name);
            }
        }

        for stage in &self.reports {
            if stage.program.trim().is_empty() {
                bail!("Report stage '{}' has no program", stage.name);
            }
        }

        self.store_location()?;
        Ok(())
    }

    pub fn store_location(&self) -> Result<StoreLocation> {
        self.db_connection.parse()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
