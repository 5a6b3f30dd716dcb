//! NAV records and the provider abstraction

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A fund tracked by the pipeline. The name is the natural key, the scheme
/// code is what the upstream API knows the fund by.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Fund {
    pub name: String,
    pub scheme_code: u32,
}

/// One NAV observation. `nav_value` is `None` when upstream sent something
/// that is not a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavRecord {
    pub fund_name: String,
    pub nav_date: NaiveDate,
    pub nav_value: Option<Decimal>,
}

impl NavRecord {
    pub fn new(fund_name: &str, nav_date: NaiveDate, nav_value: Option<Decimal>) -> Self {
        Self {
            fund_name: fund_name.to_string(),
            nav_date,
            nav_value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    FullHistory,
    LatestOnly,
}

impl Display for FetchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                FetchMode::FullHistory => "full-history",
                FetchMode::LatestOnly => "latest-only",
            }
        )
    }
}

/// Source of NAV series. Implementations return the records of a single fund,
/// sorted ascending by date.
#[async_trait]
pub trait NavProvider: Send + Sync {
    async fn fetch_nav(&self, fund: &Fund, mode: FetchMode) -> Result<Vec<NavRecord>>;
}
