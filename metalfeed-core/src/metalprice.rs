//! MetalpriceAPI adapter.
//!
//! One batched GET covers all precious-metal symbols. The API is inconsistent
//! about key naming between responses (`XAU` vs `USDXAU` vs `XAUUSD`), so each
//! symbol is looked up through a fixed priority list of candidate keys. The
//! `timeframe` endpoint serves historical chunks for backfill.

use crate::meta::today_utc;
use crate::provider::{FeedError, LatestRates, RatesSource, ResolvedRate, TimeframeRates};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct LatestResponse {
    success: Option<bool>,
    error: Option<Value>,
    rates: Option<BTreeMap<String, Value>>,
    data: Option<BTreeMap<String, Value>>,
    timestamp: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TimeframeResponse {
    success: Option<bool>,
    error: Option<Value>,
    rates: Option<BTreeMap<String, Value>>,
    data: Option<BTreeMap<String, Value>>,
}

pub struct MetalpriceClient {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
}

/// Candidate response keys for a symbol, in priority order: plain symbol
/// first, then the two pair-style conventions. First match wins.
pub fn candidate_keys(base: &str, symbol: &str) -> [String; 3] {
    [
        symbol.to_string(),
        format!("{base}{symbol}"),
        format!("{symbol}{base}"),
    ]
}

/// Look up one symbol's value in the response mapping, trying each candidate
/// key. Keys holding non-numeric values are passed over.
pub fn resolve_rate(
    rates: &BTreeMap<String, Value>,
    base: &str,
    symbol: &str,
) -> Option<ResolvedRate> {
    for key in candidate_keys(base, symbol) {
        if let Some(value) = rates.get(&key).and_then(Value::as_f64) {
            return Some(ResolvedRate { value, key });
        }
    }
    None
}

impl MetalpriceClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.metalpriceapi.com/v1";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, Self::DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    fn check_reported_failure(success: Option<bool>, error: Option<Value>) -> Result<(), FeedError> {
        if success == Some(false) {
            let detail = error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no error detail".into());
            return Err(FeedError::Shape(format!("rates API reported failure: {detail}")));
        }
        Ok(())
    }
}

impl RatesSource for MetalpriceClient {
    fn fetch_latest(&self, symbols: &[&str], base: &str) -> Result<LatestRates, FeedError> {
        let url = format!("{}/latest", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.clone()),
                ("base", base.to_string()),
                ("currencies", symbols.join(",")),
            ])
            .send()?
            .error_for_status()?;

        let payload: LatestResponse = resp
            .json()
            .map_err(|e| FeedError::Shape(format!("latest response is not JSON: {e}")))?;

        Self::check_reported_failure(payload.success, payload.error)?;

        // The API serves the mapping under `rates` or `data` depending on plan.
        let rates = payload.rates.or(payload.data).unwrap_or_default();

        // One effective date for the whole batch: the response timestamp when
        // present and valid, today (UTC) otherwise.
        let date = payload
            .timestamp
            .and_then(|ts| DateTime::from_timestamp(ts as i64, 0))
            .map(|dt| dt.date_naive())
            .unwrap_or_else(today_utc);

        let mut resolved = BTreeMap::new();
        for &symbol in symbols {
            match resolve_rate(&rates, base, symbol) {
                Some(rate) => {
                    resolved.insert(symbol.to_string(), rate);
                }
                None => {
                    let sample: Vec<&String> = rates.keys().take(12).collect();
                    log::warn!("missing {symbol} in rates response; sample keys: {sample:?}");
                }
            }
        }

        Ok(LatestRates { date, rates: resolved })
    }

    fn fetch_timeframe(
        &self,
        symbols: &[&str],
        base: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeframeRates, FeedError> {
        let url = format!("{}/timeframe", self.base_url);
        let resp = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(60))
            .query(&[
                ("api_key", self.api_key.clone()),
                ("base", base.to_string()),
                ("currencies", symbols.join(",")),
                ("start_date", start.to_string()),
                ("end_date", end.to_string()),
            ])
            .send()?
            .error_for_status()?;

        let payload: TimeframeResponse = resp
            .json()
            .map_err(|e| FeedError::Shape(format!("timeframe response is not JSON: {e}")))?;

        Self::check_reported_failure(payload.success, payload.error)?;

        let rates = payload
            .rates
            .or(payload.data)
            .ok_or_else(|| FeedError::Shape("timeframe response has no rates mapping".into()))?;

        // The timeframe endpoint keys each day's quotes by plain symbol only.
        let mut out = TimeframeRates::new();
        for (date_str, per_day) in rates {
            let Some(per_day) = per_day.as_object() else {
                continue;
            };
            let Ok(date) = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d") else {
                log::warn!("skipping unparseable date {date_str:?} in timeframe response");
                continue;
            };
            let day = out.entry(date).or_default();
            for &symbol in symbols {
                if let Some(value) = per_day.get(symbol).and_then(Value::as_f64) {
                    day.insert(symbol.to_string(), value);
                }
            }
        }

        Ok(out)
    }
}
