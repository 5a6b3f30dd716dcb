//! Full reload of the NAV history
//!
//! Destructive: the whole table is truncated before any fund is fetched, and
//! nothing is wrapped in a transaction. Only meant for bootstrapping or a
//! deliberate rebuild.

use crate::core::nav::{FetchMode, Fund, NavProvider};
use crate::core::store::NavStore;
use crate::core::sync::{FundOutcome, SyncReport, new_records};
use anyhow::{Context, Result};
use std::collections::HashSet;
use tracing::{error, info, warn};

async fn load_fund(provider: &dyn NavProvider, store: &dyn NavStore, fund: &Fund) -> Result<usize> {
    let history = provider
        .fetch_nav(fund, FetchMode::FullHistory)
        .await
        .with_context(|| format!("Failed to fetch NAV history for {}", fund.name))?;

    let records = new_records(&HashSet::new(), history);
    if records.is_empty() {
        return Ok(0);
    }

    store
        .append(&records)
        .await
        .with_context(|| format!("Failed to store NAV history for {}", fund.name))
}

/// Truncates the store and loads the complete history of every fund.
///
/// Only a failed truncate is returned as an error. Per-fund failures end up
/// in the report.
pub async fn reload_all(
    provider: &dyn NavProvider,
    store: &dyn NavStore,
    funds: &[Fund],
    on_progress: &(dyn Fn(&Fund) + Sync),
) -> Result<SyncReport> {
    warn!("Truncating NAV history before full reload");
    store
        .truncate()
        .await
        .context("Failed to truncate NAV history")?;

    let mut report = SyncReport::default();
    for fund in funds {
        info!(fund = %fund.name, "Fetching historical data");
        let outcome = match load_fund(provider, store, fund).await {
            Ok(0) => FundOutcome::Unchanged,
            Ok(n) => {
                info!(fund = %fund.name, inserted = n, "Records inserted");
                FundOutcome::Updated(n)
            }
            Err(e) => {
                error!(fund = %fund.name, error = %format!("{e:#}"), "Failed to load fund");
                FundOutcome::Failed(format!("{e:#}"))
            }
        };
        report.record(&fund.name, outcome);
        on_progress(fund);
    }
    report.log_summary("load");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sync::test_support::*;
    use crate::store::memory::MemoryNavStore;

    fn no_progress(_: &Fund) {}

    #[tokio::test]
    async fn test_reload_replaces_previous_content() {
        let store = MemoryNavStore::new();
        store
            .append(&[
                nav("Old Fund", date(2020, 1, 1), "1"),
                nav("Fund A", date(2020, 1, 1), "2"),
            ])
            .await
            .unwrap();

        let provider = MockProvider::default();
        provider.respond(
            1,
            vec![
                nav("Fund A", date(2024, 1, 1), "10"),
                nav("Fund A", date(2024, 1, 2), "11"),
            ],
        );

        let report = reload_all(&provider, &store, &[fund("Fund A", 1)], &no_progress)
            .await
            .unwrap();

        assert_eq!(report.outcome("Fund A"), Some(&FundOutcome::Updated(2)));
        assert_eq!(
            store.records().await.unwrap(),
            vec![
                nav("Fund A", date(2024, 1, 1), "10"),
                nav("Fund A", date(2024, 1, 2), "11"),
            ]
        );
    }

    #[tokio::test]
    async fn test_reload_collapses_duplicate_upstream_dates() {
        let store = MemoryNavStore::new();
        let provider = MockProvider::default();
        provider.respond(
            1,
            vec![
                nav("Fund A", date(2024, 1, 1), "10"),
                nav("Fund A", date(2024, 1, 1), "10"),
                nav("Fund A", date(2024, 1, 2), "11"),
            ],
        );

        let report = reload_all(&provider, &store, &[fund("Fund A", 1)], &no_progress)
            .await
            .unwrap();

        assert_eq!(report.new_records(), 2);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_reload_isolates_failures() {
        let store = MemoryNavStore::new();
        let provider = MockProvider::default();
        provider.fail(1, "connection refused");
        provider.respond(2, vec![nav("Fund B", date(2024, 1, 1), "5")]);
        provider.respond(3, vec![]);

        let report = reload_all(
            &provider,
            &store,
            &[fund("Fund A", 1), fund("Fund B", 2), fund("Fund C", 3)],
            &no_progress,
        )
        .await
        .unwrap();

        assert!(matches!(report.outcome("Fund A"), Some(FundOutcome::Failed(_))));
        assert_eq!(report.outcome("Fund B"), Some(&FundOutcome::Updated(1)));
        assert_eq!(report.outcome("Fund C"), Some(&FundOutcome::Unchanged));
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
