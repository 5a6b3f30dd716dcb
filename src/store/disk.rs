use crate::core::nav::NavRecord;
use crate::core::store::NavStore;
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chrono::NaiveDate;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

const PARTITION: &str = "nav_history";
const KEY_SEPARATOR: u8 = 0;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// NAV table kept in an embedded fjall keyspace.
///
/// Keys are `fund_name \0 YYYY-MM-DD`, so the natural key is unique by
/// construction and a plain scan yields (fund_name, nav_date) order. Values
/// are the decimal text of the NAV, empty when the value is missing.
pub struct FjallNavStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl FjallNavStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create store directory: {}", path.display()))?;

        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open fjall keyspace at {}", path.display()))?;
        let partition = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;
        debug!("Opened fjall store at {}", path.display());

        Ok(Self {
            keyspace,
            partition,
        })
    }

    fn fund_prefix(fund_name: &str) -> Vec<u8> {
        let mut prefix = fund_name.as_bytes().to_vec();
        prefix.push(KEY_SEPARATOR);
        prefix
    }

    fn encode_key(record: &NavRecord) -> Vec<u8> {
        let mut key = Self::fund_prefix(&record.fund_name);
        key.extend_from_slice(record.nav_date.format(DATE_FORMAT).to_string().as_bytes());
        key
    }

    fn decode_key(key: &[u8]) -> Result<(String, NaiveDate)> {
        let split = key
            .iter()
            .position(|b| *b == KEY_SEPARATOR)
            .ok_or_else(|| anyhow!("Malformed NAV key without separator"))?;
        let fund_name = std::str::from_utf8(&key[..split])?.to_string();
        let date_str = std::str::from_utf8(&key[split + 1..])?;
        let nav_date = NaiveDate::parse_from_str(date_str, DATE_FORMAT)
            .with_context(|| format!("Malformed NAV date in key: {date_str}"))?;
        Ok((fund_name, nav_date))
    }

    fn encode_value(value: Option<Decimal>) -> Vec<u8> {
        value.map(|v| v.to_string().into_bytes()).unwrap_or_default()
    }

    fn decode_value(value: &[u8]) -> Result<Option<Decimal>> {
        if value.is_empty() {
            return Ok(None);
        }
        let text = std::str::from_utf8(value)?;
        Ok(Some(Decimal::from_str(text).with_context(|| {
            format!("Malformed NAV value in store: {text}")
        })?))
    }
}

#[async_trait]
impl NavStore for FjallNavStore {
    async fn fund_dates(&self, fund_name: &str) -> Result<HashSet<NaiveDate>> {
        let mut dates = HashSet::new();
        for item in self.partition.prefix(Self::fund_prefix(fund_name)) {
            let (key, _) = item?;
            let (_, date) = Self::decode_key(&key)?;
            dates.insert(date);
        }
        debug!("Fjall store found {} dates for {}", dates.len(), fund_name);
        Ok(dates)
    }

    async fn append(&self, records: &[NavRecord]) -> Result<usize> {
        let mut batch = self.keyspace.batch();
        let mut seen = HashSet::new();
        for record in records {
            let key = Self::encode_key(record);
            if self.partition.contains_key(&key)? || !seen.insert(key.clone()) {
                bail!(
                    "Duplicate NAV record for {} on {}",
                    record.fund_name,
                    record.nav_date
                );
            }
            batch.insert(&self.partition, key, Self::encode_value(record.nav_value));
        }
        batch.commit()?;
        self.keyspace.persist(PersistMode::SyncAll)?;

        debug!("Fjall store APPEND {} records", records.len());
        Ok(records.len())
    }

    async fn truncate(&self) -> Result<()> {
        let mut batch = self.keyspace.batch();
        for item in self.partition.iter() {
            let (key, _) = item?;
            batch.remove(&self.partition, key);
        }
        batch.commit()?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Fjall store TRUNCATE");
        Ok(())
    }

    async fn records(&self) -> Result<Vec<NavRecord>> {
        self.partition
            .iter()
            .map(|item| {
                let (key, value) = item?;
                let (fund_name, nav_date) = Self::decode_key(&key)?;
                Ok(NavRecord {
                    fund_name,
                    nav_date,
                    nav_value: Self::decode_value(&value)?,
                })
            })
            .collect()
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.partition.len()?)
    }
}
