//! Run metadata and the once-per-UTC-day gate.
//!
//! The meta record is overwritten wholesale after every successful run. Its
//! only load-bearing field is `last_updated_utc`, which the gate prefix-checks
//! against today's UTC date; the rest is an audit note. This is a debounce,
//! not a lock — a single sequential process per day is assumed.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timestamp format stored in `last_updated_utc`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub last_updated_utc: String,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub note: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, serde_json::Value>,
}

impl Meta {
    /// Build the record for a run that just completed, stamped with now (UTC).
    pub fn for_run(
        symbols: Vec<String>,
        base: &str,
        note: &str,
        sources: BTreeMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            last_updated_utc: Utc::now().format(TIMESTAMP_FORMAT).to_string(),
            symbols,
            base: base.to_string(),
            note: note.to_string(),
            sources,
        }
    }

    /// The run gate: true when the stored timestamp starts with today's
    /// `YYYY-MM-DD`. A force flag bypasses this check entirely.
    pub fn already_updated_today(&self, today: NaiveDate) -> bool {
        self.last_updated_utc
            .starts_with(&today.format("%Y-%m-%d").to_string())
    }
}

/// Today's UTC calendar date.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}
