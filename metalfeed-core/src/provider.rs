//! Source traits and structured error types.
//!
//! The two source traits abstract over the upstream feeds (batched rates API,
//! per-ticker CSV closes) so the orchestrators can be tested against counting
//! fakes without any network access.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;

/// Error taxonomy for a run. Every variant is fatal to the run that hits it;
/// data-quality problems (a symbol absent from a response, a non-numeric
/// value) are logged and skipped instead of surfacing here.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("METALPRICE_API_KEY is not set")]
    MissingApiKey,

    #[error("http request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response shape: {0}")]
    Shape(String),

    #[error("store error: {0}")]
    Store(String),
}

/// One resolved quote from the rates API.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRate {
    pub value: f64,
    /// The response key that matched (plain or pair-style).
    pub key: String,
}

/// Result of the batched latest-rates call: one effective date for the whole
/// batch plus the per-symbol values that resolved.
#[derive(Debug, Clone)]
pub struct LatestRates {
    pub date: NaiveDate,
    pub rates: BTreeMap<String, ResolvedRate>,
}

/// Historical rates keyed by date, then by symbol.
pub type TimeframeRates = BTreeMap<NaiveDate, BTreeMap<String, f64>>;

/// Batched JSON rates source (precious metals).
pub trait RatesSource {
    /// Latest quotes for a set of symbols against a base currency, in one call.
    fn fetch_latest(&self, symbols: &[&str], base: &str) -> Result<LatestRates, FeedError>;

    /// Historical quotes over an inclusive date range, for backfill chunks.
    fn fetch_timeframe(
        &self,
        symbols: &[&str],
        base: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeframeRates, FeedError>;
}

/// Per-ticker CSV daily-close source (futures proxies). No batching available;
/// each ticker is a separate fetch.
pub trait DailyCloseSource {
    fn fetch_daily_close(&self, ticker: &str) -> Result<(NaiveDate, f64), FeedError>;
}
