//! One-shot historical backfill.
//!
//! Walks the requested span in 365-day chunks against the timeframe endpoint,
//! accumulating every chunk in memory, then merges and writes each symbol's
//! full series at the end. Fail-fast: a failed chunk call aborts the run
//! before anything is written. There is no intermediate checkpointing, so a
//! crash mid-run loses the run's progress.

use crate::meta::{today_utc, Meta};
use crate::provider::{FeedError, RatesSource};
use crate::series::merge_backfill;
use crate::store::SeriesStore;
use crate::update::ALL_SYMBOLS;
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct BackfillOutcome {
    pub calls: u32,
    /// Rows written per symbol.
    pub written: Vec<(String, usize)>,
}

pub fn run_backfill(
    store: &dyn SeriesStore,
    rates: &dyn RatesSource,
    base: &str,
    years: u32,
) -> Result<BackfillOutcome, FeedError> {
    let end = today_utc();
    let start = end - Duration::days(365 * i64::from(years));
    backfill_range(store, rates, base, start, end)
}

pub fn backfill_range(
    store: &dyn SeriesStore,
    rates: &dyn RatesSource,
    base: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<BackfillOutcome, FeedError> {
    let chunk = Duration::days(365);

    let mut batches: BTreeMap<&str, Vec<(NaiveDate, Option<f64>)>> =
        ALL_SYMBOLS.iter().map(|&s| (s, Vec::new())).collect();

    let mut calls = 0u32;
    let mut cursor = start;
    while cursor < end {
        let chunk_end = end.min(cursor + chunk);

        let frame = rates.fetch_timeframe(&ALL_SYMBOLS, base, cursor, chunk_end)?;
        calls += 1;

        for (date, per_day) in frame {
            for (symbol, value) in per_day {
                if let Some(batch) = batches.get_mut(symbol.as_str()) {
                    batch.push((date, Some(value)));
                }
            }
        }

        log::info!("fetched {cursor} -> {chunk_end} (call #{calls})");
        cursor = chunk_end + Duration::days(1);
    }

    let mut written = Vec::new();
    for symbol in ALL_SYMBOLS {
        let existing = store.load(symbol)?;
        let rows = merge_backfill(&existing, batches.remove(symbol).unwrap_or_default());
        store.save(symbol, &rows)?;
        log::info!("wrote {symbol}: {} rows", rows.len());
        written.push((symbol.to_string(), rows.len()));
    }

    let meta = Meta::for_run(
        ALL_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        base,
        &format!("Backfilled {start} -> {end} in {calls} timeframe API calls, then wrote series."),
        BTreeMap::new(),
    );
    store.save_meta(&meta)?;

    Ok(BackfillOutcome { calls, written })
}
