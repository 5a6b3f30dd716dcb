//! Incremental NAV synchronization
//!
//! Each fund is processed on its own: the dates already stored for the fund
//! are read, the fetched candidates are reduced to dates not yet present, and
//! only that delta is appended. Running a sync twice against unchanged
//! upstream data writes nothing the second time.

use crate::core::nav::{FetchMode, Fund, NavProvider, NavRecord};
use crate::core::store::NavStore;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{error, info};

/// What happened to one fund during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FundOutcome {
    Updated(usize),
    Unchanged,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundReport {
    pub fund_name: String,
    pub outcome: FundOutcome,
}

/// Per-fund outcomes of a sync or load, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub funds: Vec<FundReport>,
}

impl SyncReport {
    pub fn record(&mut self, fund_name: &str, outcome: FundOutcome) {
        self.funds.push(FundReport {
            fund_name: fund_name.to_string(),
            outcome,
        });
    }

    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, FundOutcome::Updated(_)))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, FundOutcome::Unchanged))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FundOutcome::Failed(_)))
    }

    /// Total records written across all funds.
    pub fn new_records(&self) -> usize {
        self.funds
            .iter()
            .map(|f| match f.outcome {
                FundOutcome::Updated(n) => n,
                _ => 0,
            })
            .sum()
    }

    pub fn is_partial(&self) -> bool {
        self.failed() > 0
    }

    pub fn outcome(&self, fund_name: &str) -> Option<&FundOutcome> {
        self.funds
            .iter()
            .find(|f| f.fund_name == fund_name)
            .map(|f| &f.outcome)
    }

    pub fn log_summary(&self, operation: &str) {
        info!(
            operation,
            updated = self.updated(),
            unchanged = self.unchanged(),
            failed = self.failed(),
            new_records = self.new_records(),
            "Run finished"
        );
    }

    fn count(&self, pred: impl Fn(&FundOutcome) -> bool) -> usize {
        self.funds.iter().filter(|f| pred(&f.outcome)).count()
    }
}

/// Candidates whose date is not in `existing`. Repeated dates within the
/// candidates keep their first occurrence.
pub fn new_records(existing: &HashSet<NaiveDate>, candidates: Vec<NavRecord>) -> Vec<NavRecord> {
    let mut seen = existing.clone();
    candidates
        .into_iter()
        .filter(|record| seen.insert(record.nav_date))
        .collect()
}

/// Syncs a single fund and returns the number of records appended.
pub async fn sync_fund(
    provider: &dyn NavProvider,
    store: &dyn NavStore,
    fund: &Fund,
    mode: FetchMode,
) -> Result<usize> {
    let existing = store
        .fund_dates(&fund.name)
        .await
        .with_context(|| format!("Failed to read stored dates for {}", fund.name))?;
    let candidates = provider
        .fetch_nav(fund, mode)
        .await
        .with_context(|| format!("Failed to fetch NAV for {}", fund.name))?;

    let delta = new_records(&existing, candidates);
    if delta.is_empty() {
        info!(fund = %fund.name, "No new NAV");
        return Ok(0);
    }

    let written = store
        .append(&delta)
        .await
        .with_context(|| format!("Failed to store NAV for {}", fund.name))?;
    info!(fund = %fund.name, written, "New NAV records added");
    Ok(written)
}

/// Syncs every fund in order. A failing fund is recorded and skipped, it
/// never stops the remaining funds.
pub async fn sync_all(
    provider: &dyn NavProvider,
    store: &dyn NavStore,
    funds: &[Fund],
    mode: FetchMode,
    on_progress: &(dyn Fn(&Fund) + Sync),
) -> SyncReport {
    let mut report = SyncReport::default();
    for fund in funds {
        let outcome = match sync_fund(provider, store, fund, mode).await {
            Ok(0) => FundOutcome::Unchanged,
            Ok(n) => FundOutcome::Updated(n),
            Err(e) => {
                error!(fund = %fund.name, error = %format!("{e:#}"), "Failed to update fund");
                FundOutcome::Failed(format!("{e:#}"))
            }
        };
        report.record(&fund.name, outcome);
        on_progress(fund);
    }
    report.log_summary("sync");
    report
}
