//! Stooq daily-close adapter.
//!
//! Stooq serves a plain CSV download per ticker, ascending by date, with no
//! batch endpoint. Block pages and errors come back as HTML with HTTP 200, so
//! the body is sniffed before parsing. Parsing is a pure function so the
//! format edge cases (BOM, semicolon delimiter, junk payloads) are testable
//! without a network.

use crate::provider::{DailyCloseSource, FeedError};
use chrono::NaiveDate;
use std::time::Duration;

// Stooq blocks "generic" HTTP clients; a browser-ish User-Agent gets through.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

pub struct StooqClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl StooqClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://stooq.com";

    pub fn new() -> Self {
        Self::with_base_url(Self::DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(45))
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn csv_url(&self, ticker: &str) -> String {
        format!("{}/q/d/l/?s={}&i=d", self.base_url, ticker.to_lowercase())
    }
}

impl Default for StooqClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DailyCloseSource for StooqClient {
    fn fetch_daily_close(&self, ticker: &str) -> Result<(NaiveDate, f64), FeedError> {
        let body = self
            .client
            .get(self.csv_url(ticker))
            .send()?
            .error_for_status()?
            .text()?;
        parse_daily_close(ticker, &body)
    }
}

/// Extract `(date, close)` from the most recent row of a Stooq CSV document.
///
/// Accepts comma- or semicolon-delimited CSV with at least `Date` and `Close`
/// header fields (case-insensitive), optionally BOM-prefixed. Empty bodies and
/// HTML error pages are shape errors carrying a payload snippet.
pub fn parse_daily_close(ticker: &str, body: &str) -> Result<(NaiveDate, f64), FeedError> {
    let text = body.trim();
    if text.is_empty() {
        return Err(FeedError::Shape(format!("empty response from Stooq for {ticker}")));
    }

    let lower = text.to_lowercase();
    if lower.contains("<html") || lower.contains("<!doctype html") {
        return Err(FeedError::Shape(format!(
            "Stooq returned HTML (not CSV) for {ticker}; first 200 chars: {:?}",
            snippet(text)
        )));
    }

    let text = text.trim_start_matches('\u{feff}');
    let header = text.lines().next().unwrap_or("").trim();
    let header_lower = header.to_lowercase();
    if !header_lower.contains("date") || !header_lower.contains("close") {
        return Err(FeedError::Shape(format!(
            "unexpected Stooq header for {ticker}: {header:?}; first 200 chars: {:?}",
            snippet(text)
        )));
    }

    let delimiter = if header.contains(';') && !header.contains(',') {
        b';'
    } else {
        b','
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| FeedError::Shape(format!("unreadable Stooq header for {ticker}: {e}")))?;
    let date_idx = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("date"));
    let close_idx = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("close"));
    let (Some(date_idx), Some(close_idx)) = (date_idx, close_idx) else {
        return Err(FeedError::Shape(format!(
            "Stooq header for {ticker} lacks Date/Close columns: {headers:?}"
        )));
    };

    // Document is ascending by date; the last row is the latest close.
    let mut last = None;
    for record in reader.records() {
        let record =
            record.map_err(|e| FeedError::Shape(format!("malformed CSV row for {ticker}: {e}")))?;
        last = Some(record);
    }
    let last = last
        .ok_or_else(|| FeedError::Shape(format!("no data rows returned from Stooq for {ticker}")))?;

    let date_str = last.get(date_idx).unwrap_or("").trim();
    let close_str = last.get(close_idx).unwrap_or("").trim();
    if date_str.is_empty() || close_str.is_empty() {
        return Err(FeedError::Shape(format!(
            "missing Date/Close in last row for {ticker}: {last:?}"
        )));
    }

    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|e| FeedError::Shape(format!("bad date {date_str:?} for {ticker}: {e}")))?;
    let close = close_str
        .parse::<f64>()
        .map_err(|e| FeedError::Shape(format!("bad close {close_str:?} for {ticker}: {e}")))?;

    Ok((date, close))
}

fn snippet(text: &str) -> String {
    text.chars().take(200).collect()
}
