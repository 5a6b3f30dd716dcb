//! Persistence contract for the NAV history table

use crate::core::nav::NavRecord;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;

/// The NAV history table. At most one record per (fund_name, nav_date) is
/// ever written through this interface.
#[async_trait]
pub trait NavStore: Send + Sync {
    /// Dates already stored for a fund.
    async fn fund_dates(&self, fund_name: &str) -> Result<HashSet<NaiveDate>>;

    /// Appends records in one batch and returns how many were written.
    async fn append(&self, records: &[NavRecord]) -> Result<usize>;

    /// Removes every record for every fund.
    async fn truncate(&self) -> Result<()>;

    /// Every record, ordered by (fund_name, nav_date).
    async fn records(&self) -> Result<Vec<NavRecord>>;

    async fn count(&self) -> Result<usize>;
}
