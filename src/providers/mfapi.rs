use crate::core::nav::{FetchMode, Fund, NavProvider, NavRecord};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const SUCCESS_STATUS: &str = "SUCCESS";
const API_DATE_FORMAT: &str = "%d-%m-%Y";

/// NAV provider for the mfapi.in scheme endpoints.
pub struct MfApiProvider {
    base_url: String,
    client: reqwest::Client,
}

impl MfApiProvider {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder =
            reqwest::Client::builder().user_agent(concat!("navsync/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }

    fn url(&self, scheme_code: u32, mode: FetchMode) -> String {
        match mode {
            FetchMode::FullHistory => format!("{}/mf/{}", self.base_url, scheme_code),
            FetchMode::LatestOnly => format!("{}/mf/{}/latest", self.base_url, scheme_code),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MfApiMeta {
    scheme_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MfApiNav {
    date: String,
    #[serde(default)]
    nav: Value,
}

#[derive(Debug, Deserialize)]
struct MfApiResponse {
    #[serde(default)]
    meta: Option<MfApiMeta>,
    #[serde(default)]
    data: Vec<MfApiNav>,
    status: String,
}

/// Coerces an upstream NAV to a decimal. Anything unparseable is missing.
fn parse_nav_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        _ => None,
    }
}

#[async_trait]
impl NavProvider for MfApiProvider {
    async fn fetch_nav(&self, fund: &Fund, mode: FetchMode) -> Result<Vec<NavRecord>> {
        let url = self.url(fund.scheme_code, mode);
        debug!("Requesting {} NAV data from {}", mode, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to send request for scheme {}", fund.scheme_code))?
            .error_for_status()
            .with_context(|| format!("NAV API returned an error for scheme {}", fund.scheme_code))?;

        let response_text = response.text().await.with_context(|| {
            format!(
                "Failed to get response text for scheme {}",
                fund.scheme_code
            )
        })?;

        if response_text.trim().is_empty() {
            return Err(anyhow!(
                "Received empty response for scheme {}",
                fund.scheme_code
            ));
        }

        let api_response: MfApiResponse =
            serde_json::from_str(&response_text).with_context(|| {
                format!(
                    "Failed to parse NAV response for scheme {}. Response: '{response_text}'",
                    fund.scheme_code
                )
            })?;

        if api_response.status != SUCCESS_STATUS {
            bail!(
                "API call failed for scheme {} with status '{}'",
                fund.scheme_code,
                api_response.status
            );
        }

        if let Some(name) = api_response.meta.and_then(|m| m.scheme_name) {
            debug!("Scheme {} is '{}'", fund.scheme_code, name);
        }

        let mut records = api_response
            .data
            .iter()
            .map(|point| {
                let nav_date = NaiveDate::parse_from_str(point.date.trim(), API_DATE_FORMAT)
                    .with_context(|| {
                        format!(
                            "Invalid NAV date '{}' for scheme {}",
                            point.date, fund.scheme_code
                        )
                    })?;
                let nav_value = parse_nav_value(&point.nav);
                if nav_value.is_none() {
                    debug!(
                        "Missing NAV value for {} on {}: {}",
                        fund.name, nav_date, point.nav
                    );
                }
                Ok(NavRecord::new(&fund.name, nav_date, nav_value))
            })
            .collect::<Result<Vec<_>>>()?;

        records.sort_by_key(|r| r.nav_date);

        debug!(
            "Fetched {} NAV records for {} ({})",
            records.len(),
            fund.name,
            mode
        );
        Ok(records)
    }
}
