//! Series model and the upsert / backfill merge engine.
//!
//! A series is one symbol's price history: a date-ascending list of points,
//! at most one per calendar date. Both mutation paths rewrite the full list,
//! so the sort and uniqueness invariants hold on every save.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One observation in a series. Serializes as `{"date":"YYYY-MM-DD","value":N}`;
/// `value` may be null in files written by older tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl Point {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self {
            date,
            value: Some(value),
        }
    }
}

/// Insert-or-update a single point, keyed by date.
///
/// The scan runs backward from the tail: the common case is today's quote
/// landing on the last element, but out-of-order historical corrections must
/// replace their existing record rather than append a duplicate. A new record
/// is appended only when no same-date match exists anywhere, and the series
/// is re-sorted so the result is always ascending.
pub fn upsert_point(series: &mut Vec<Point>, point: Point) {
    match series.iter().rposition(|p| p.date == point.date) {
        Some(i) => series[i].value = point.value,
        None => series.push(point),
    }
    series.sort_by_key(|p| p.date);
}

/// Merge a bulk batch of historical pairs into an existing series.
///
/// The existing series is lifted into a date-keyed map so each batch pair
/// merges in O(log n); batch values overwrite existing values for the same
/// date, and pairs without a numeric value are discarded. The output comes
/// back sorted ascending by construction.
pub fn merge_backfill(
    existing: &[Point],
    batch: impl IntoIterator<Item = (NaiveDate, Option<f64>)>,
) -> Vec<Point> {
    let mut by_date: BTreeMap<NaiveDate, f64> = existing
        .iter()
        .filter_map(|p| p.value.map(|v| (p.date, v)))
        .collect();

    for (date, value) in batch {
        if let Some(v) = value {
            by_date.insert(date, v);
        }
    }

    by_date
        .into_iter()
        .map(|(date, value)| Point::new(date, value))
        .collect()
}
