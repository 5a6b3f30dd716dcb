pub mod disk;
pub mod memory;
pub mod postgres;

use crate::core::store::NavStore;
use anyhow::{Result, bail};
use disk::FjallNavStore;
use memory::MemoryNavStore;
use postgres::PgNavStore;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Where the NAV table lives, parsed from the `db_connection` setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Postgres(String),
    Fjall(PathBuf),
    Memory,
}

impl FromStr for StoreLocation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(StoreLocation::Postgres(s.to_string()))
        } else if let Some(path) = s.strip_prefix("fjall://") {
            if path.is_empty() {
                bail!("fjall store location needs a directory, e.g. fjall:///var/lib/navsync");
            }
            Ok(StoreLocation::Fjall(PathBuf::from(path)))
        } else if s == "memory://" {
            Ok(StoreLocation::Memory)
        } else {
            bail!(
                "Unsupported db_connection '{}', expected postgres://, fjall:// or memory://",
                redact(s)
            )
        }
    }
}

/// Drops anything that looks like credentials before a connection string is
/// shown to the user.
fn redact(connection: &str) -> String {
    match connection.split_once('@') {
        Some((_, host)) => format!("***@{host}"),
        None => connection.to_string(),
    }
}

/// Opens the store for a location.
pub async fn open_store(location: &StoreLocation) -> Result<Arc<dyn NavStore>> {
    debug!(store = %location_label(location), "Opening NAV store");
    Ok(match location {
        StoreLocation::Postgres(url) => Arc::new(PgNavStore::connect(url).await?),
        StoreLocation::Fjall(path) => Arc::new(FjallNavStore::open(path)?),
        StoreLocation::Memory => Arc::new(MemoryNavStore::new()),
    })
}

pub fn location_label(location: &StoreLocation) -> String {
    match location {
        StoreLocation::Postgres(url) => redact(url),
        StoreLocation::Fjall(path) => format!("fjall://{}", path.display()),
        StoreLocation::Memory => "memory://".to_string(),
    }
}
