use crate::core::nav::NavRecord;
use crate::core::store::NavStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder};
use std::collections::HashSet;
use tracing::{debug, info};

/// Rows per INSERT statement. Three binds per row keeps this well below the
/// 65535 parameter limit of the Postgres protocol.
const INSERT_CHUNK_ROWS: usize = 1000;

/// Row shape of `nav_history`.
#[derive(Debug, Clone, FromRow)]
struct NavRow {
    fund_name: String,
    nav_date: NaiveDate,
    nav_value: Option<Decimal>,
}

impl From<NavRow> for NavRecord {
    fn from(row: NavRow) -> Self {
        NavRecord {
            fund_name: row.fund_name,
            nav_date: row.nav_date,
            nav_value: row.nav_value,
        }
    }
}

/// NAV table in PostgreSQL.
///
/// Expects an existing table:
///
/// ```sql
/// CREATE TABLE nav_history (
///     id SERIAL PRIMARY KEY,
///     fund_name TEXT NOT NULL,
///     nav_date DATE NOT NULL,
///     nav_value NUMERIC
/// );
/// ```
pub struct PgNavStore {
    pool: PgPool,
}

impl PgNavStore {
    pub async fn connect(url: &str) -> Result<Self> {
        // Funds are processed one at a time, a single connection is enough
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .context("Failed to connect to PostgreSQL")?;
        info!("Connected to PostgreSQL NAV store");
        Ok(Self { pool })
    }
}

#[async_trait]
impl NavStore for PgNavStore {
    async fn fund_dates(&self, fund_name: &str) -> Result<HashSet<NaiveDate>> {
        let dates: Vec<NaiveDate> =
            sqlx::query_scalar("SELECT nav_date FROM nav_history WHERE fund_name = $1")
                .bind(fund_name)
                .fetch_all(&self.pool)
                .await
                .with_context(|| format!("Failed to read stored dates for {fund_name}"))?;
        Ok(dates.into_iter().collect())
    }

    async fn append(&self, records: &[NavRecord]) -> Result<usize> {
        let mut written = 0;
        for chunk in records.chunks(INSERT_CHUNK_ROWS) {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO nav_history (fund_name, nav_date, nav_value) ");
            builder.push_values(chunk, |mut row, record| {
                row.push_bind(record.fund_name.clone())
                    .push_bind(record.nav_date)
                    .push_bind(record.nav_value);
            });
            let result = builder
                .build()
                .execute(&self.pool)
                .await
                .context("Failed to insert NAV records")?;
            written += result.rows_affected() as usize;
        }
        debug!("Postgres store APPEND {} records", written);
        Ok(written)
    }

    async fn truncate(&self) -> Result<()> {
        sqlx::query("TRUNCATE TABLE nav_history RESTART IDENTITY")
            .execute(&self.pool)
            .await
            .context("Failed to truncate nav_history")?;
        info!("nav_history table truncated");
        Ok(())
    }

    async fn records(&self) -> Result<Vec<NavRecord>> {
        let rows: Vec<NavRow> = sqlx::query_as(
            "SELECT fund_name, nav_date, nav_value FROM nav_history ORDER BY fund_name, nav_date",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to read nav_history")?;
        Ok(rows.into_iter().map(NavRecord::from).collect())
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM nav_history")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count nav_history rows")?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use tokio::sync::{Mutex, MutexGuard};

    // The tests share one table, so they run one at a time
    static TABLE_LOCK: Mutex<()> = Mutex::const_new(());

    const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS nav_history (
        id SERIAL PRIMARY KEY,
        fund_name TEXT NOT NULL,
        nav_date DATE NOT NULL,
        nav_value NUMERIC
    )";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(fund: &str, nav_date: NaiveDate, value: Option<&str>) -> NavRecord {
        NavRecord::new(fund, nav_date, value.map(|v| Decimal::from_str(v).unwrap()))
    }

    /// Connects to `DATABASE_URL` and starts from an empty table.
    async fn empty_store() -> (PgNavStore, MutexGuard<'static, ()>) {
        let guard = TABLE_LOCK.lock().await;
        let url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must point at a scratch PostgreSQL database");
        let store = PgNavStore::connect(&url).await.unwrap();
        sqlx::query(CREATE_TABLE).execute(&store.pool).await.unwrap();
        store.truncate().await.unwrap();
        (store, guard)
    }

    #[tokio::test]
    #[ignore] // needs DATABASE_URL
    async fn test_append_spans_insert_chunks() {
        let (store, _guard) = empty_store().await;
        let rows = INSERT_CHUNK_ROWS + 7;
        let start = date(2020, 1, 1);
        let records: Vec<NavRecord> = (0..rows)
            .map(|i| {
                let nav_date = start + chrono::Days::new(i as u64);
                record("Fund X", nav_date, Some(format!("{}.25", 100 + i).as_str()))
            })
            .collect();

        assert_eq!(store.append(&records).await.unwrap(), rows);
        assert_eq!(store.count().await.unwrap(), rows);
        assert_eq!(store.fund_dates("Fund X").await.unwrap().len(), rows);
        assert_eq!(store.records().await.unwrap(), records);
    }

    #[tokio::test]
    #[ignore] // needs DATABASE_URL
    async fn test_missing_value_round_trips_as_null() {
        let (store, _guard) = empty_store().await;
        store
            .append(&[
                record("Fund X", date(2024, 1, 1), Some("100.50")),
                record("Fund X", date(2024, 1, 2), None),
            ])
            .await
            .unwrap();

        let nulls: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM nav_history WHERE nav_value IS NULL")
                .fetch_one(&store.pool)
                .await
                .unwrap();
        assert_eq!(nulls, 1);

        let records = store.records().await.unwrap();
        assert_eq!(records[0].nav_value, Some(Decimal::from_str("100.50").unwrap()));
        assert_eq!(records[1].nav_value, None);
    }

    #[tokio::test]
    #[ignore] // needs DATABASE_URL
    async fn test_fund_dates_and_order_are_per_fund() {
        let (store, _guard) = empty_store().await;
        store
            .append(&[
                record("Fund B", date(2024, 1, 1), Some("2")),
                record("Fund A", date(2024, 1, 2), Some("1.5")),
                record("Fund A", date(2024, 1, 1), Some("1")),
            ])
            .await
            .unwrap();

        let dates = store.fund_dates("Fund A").await.unwrap();
        assert_eq!(dates, [date(2024, 1, 1), date(2024, 1, 2)].into());
        assert_eq!(store.fund_dates("Fund B").await.unwrap().len(), 1);
        assert!(store.fund_dates("Fund C").await.unwrap().is_empty());

        let order: Vec<(String, NaiveDate)> = store
            .records()
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.fund_name, r.nav_date))
            .collect();
        assert_eq!(
            order,
            vec![
                ("Fund A".to_string(), date(2024, 1, 1)),
                ("Fund A".to_string(), date(2024, 1, 2)),
                ("Fund B".to_string(), date(2024, 1, 1)),
            ]
        );
    }

    #[tokio::test]
    #[ignore] // needs DATABASE_URL
    async fn test_truncate_restarts_identity() {
        let (store, _guard) = empty_store().await;
        store
            .append(&[
                record("Fund A", date(2024, 1, 1), Some("1")),
                record("Fund B", date(2024, 1, 1), Some("2")),
            ])
            .await
            .unwrap();

        store.truncate().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.fund_dates("Fund A").await.unwrap().is_empty());

        store
            .append(&[record("Fund A", date(2024, 1, 3), Some("3"))])
            .await
            .unwrap();
        let first_id: i32 = sqlx::query_scalar("SELECT MIN(id) FROM nav_history")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(first_id, 1);
    }
}
