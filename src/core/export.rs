//! Master table export

use crate::core::nav::NavRecord;
use crate::core::store::NavStore;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

pub const HEADER: [&str; 3] = ["fund_name", "nav_date", "nav_value"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub rows: usize,
    pub paths: Vec<PathBuf>,
}

/// Renders records as CSV. Missing values become empty cells.
pub fn render_csv(records: &[NavRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(HEADER)?;
    for r in records {
        let nav_date = r.nav_date.format("%Y-%m-%d").to_string();
        let nav_value = r.nav_value.map(|v| v.to_string()).unwrap_or_default();
        wtr.write_record([r.fund_name.as_str(), nav_date.as_str(), nav_value.as_str()])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn write_snapshot(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write master table to {}", path.display()))
}

/// Reads the whole store and writes the same snapshot to every target.
pub async fn export_master_table(store: &dyn NavStore, targets: &[&Path]) -> Result<ExportSummary> {
    let mut records = store
        .records()
        .await
        .context("Failed to read NAV history for export")?;

    // Database collations may order names differently, the snapshot is always
    // byte-ordered by (fund_name, nav_date)
    records.sort_by(|a, b| {
        a.fund_name
            .as_bytes()
            .cmp(b.fund_name.as_bytes())
            .then(a.nav_date.cmp(&b.nav_date))
    });

    let content = render_csv(&records)?;
    for target in targets {
        write_snapshot(target, &content)?;
    }

    info!(
        rows = records.len(),
        targets = targets.len(),
        "Master table created"
    );
    Ok(ExportSummary {
        rows: records.len(),
        paths: targets.iter().map(|p| p.to_path_buf()).collect(),
    })
}

/// Number of data rows in a snapshot file, or `None` when it can't be read.
pub fn snapshot_rows(path: &Path) -> Option<usize> {
    let mut rdr = csv::Reader::from_path(path).ok()?;
    let mut rows = 0;
    for record in rdr.records() {
        record.ok()?;
        rows += 1;
    }
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sync::test_support::*;
    use crate::store::memory::MemoryNavStore;
    use tempfile::TempDir;

    #[test]
    fn test_render_csv() {
        let mut missing = nav("Fund, with comma", date(2024, 1, 2), "0");
        missing.nav_value = None;
        let csv = render_csv(&[nav("Fund X", date(2024, 1, 1), "100.50"), missing]).unwrap();

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "fund_name,nav_date,nav_value");
        assert_eq!(lines[1], "Fund X,2024-01-01,100.50");
        assert_eq!(lines[2], "\"Fund, with comma\",2024-01-02,");
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_csv(&[]).unwrap(), "fund_name,nav_date,nav_value\n");
    }

    #[tokio::test]
    async fn test_export_writes_identical_sorted_snapshots() -> Result<()> {
        let dir = TempDir::new()?;
        let raw = dir.path().join("data/raw/master_table_raw.csv");
        let processed = dir.path().join("data/master_table.csv");

        let store = MemoryNavStore::new();
        store
            .append(&[
                nav("Fund X", date(2024, 1, 2), "101.5"),
                nav("Fund A", date(2024, 1, 1), "10"),
                nav("Fund X", date(2024, 1, 1), "100.0"),
            ])
            .await?;

        let summary = export_master_table(&store, &[raw.as_path(), processed.as_path()]).await?;

        assert_eq!(summary.rows, store.count().await?);
        assert_eq!(summary.paths, vec![raw.clone(), processed.clone()]);

        let raw_content = std::fs::read_to_string(&raw)?;
        assert_eq!(raw_content, std::fs::read_to_string(&processed)?);
        assert_eq!(
            raw_content,
            "fund_name,nav_date,nav_value\n\
             Fund A,2024-01-01,10\n\
             Fund X,2024-01-01,100.0\n\
             Fund X,2024-01-02,101.5\n"
        );
        assert_eq!(snapshot_rows(&raw), Some(3));

        // Export never changes the store
        assert_eq!(store.count().await?, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_export_overwrites_previous_snapshot() -> Result<()> {
        let dir = TempDir::new()?;
        let target = dir.path().join("master_table.csv");
        std::fs::write(&target, "stale\ncontent\nwith\nrows\n")?;

        let store = MemoryNavStore::new();
        store.append(&[nav("Fund A", date(2024, 1, 1), "1")]).await?;

        export_master_table(&store, &[target.as_path()]).await?;

        assert_eq!(snapshot_rows(&target), Some(1));
        Ok(())
    }

    #[test]
    fn test_snapshot_rows_missing_file() {
        assert_eq!(snapshot_rows(Path::new("/nonexistent/master_table.csv")), None);
    }
}
