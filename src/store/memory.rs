use crate::core::nav::NavRecord;
use crate::core::store::NavStore;
use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

type NavKey = (String, NaiveDate);

/// In-memory NAV table backed by an ordered map, so iteration already follows
/// (fund_name, nav_date).
#[derive(Clone)]
pub struct MemoryNavStore {
    inner: Arc<Mutex<BTreeMap<NavKey, Option<Decimal>>>>,
}

impl MemoryNavStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

impl Default for MemoryNavStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NavStore for MemoryNavStore {
    async fn fund_dates(&self, fund_name: &str) -> Result<HashSet<NaiveDate>> {
        let table = self.inner.lock().await;
        Ok(table
            .keys()
            .filter(|(name, _)| name == fund_name)
            .map(|(_, date)| *date)
            .collect())
    }

    async fn append(&self, records: &[NavRecord]) -> Result<usize> {
        let mut table = self.inner.lock().await;

        // Reject the whole batch before touching the table
        let mut seen = HashSet::new();
        for record in records {
            let key = (record.fund_name.clone(), record.nav_date);
            if table.contains_key(&key) || !seen.insert(key) {
                bail!(
                    "Duplicate NAV record for {} on {}",
                    record.fund_name,
                    record.nav_date
                );
            }
        }

        for record in records {
            table.insert(
                (record.fund_name.clone(), record.nav_date),
                record.nav_value,
            );
        }
        debug!("Memory store APPEND {} records", records.len());
        Ok(records.len())
    }

    async fn truncate(&self) -> Result<()> {
        self.inner.lock().await.clear();
        debug!("Memory store TRUNCATE");
        Ok(())
    }

    async fn records(&self) -> Result<Vec<NavRecord>> {
        let table = self.inner.lock().await;
        Ok(table
            .iter()
            .map(|((name, date), value)| NavRecord::new(name, *date, *value))
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.inner.lock().await.len())
    }
}
