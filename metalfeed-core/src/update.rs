//! Daily update orchestration.
//!
//! One run: consult the gate, fetch the batched rates, upsert each resolved
//! symbol, fetch the per-ticker CSV closes sequentially, upsert those, then
//! rewrite the meta record. Everything is blocking and sequential; any fatal
//! error aborts the run, leaving only the upserts that already completed.

use crate::meta::{today_utc, Meta};
use crate::provider::{DailyCloseSource, FeedError, RatesSource};
use crate::series::{upsert_point, Point};
use crate::store::SeriesStore;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Symbols served by the batched rates call.
pub const RATES_SYMBOLS: [&str; 4] = ["XAU", "XAG", "XPD", "XPT"];

/// Symbols served by per-ticker CSV closes, with their futures-proxy tickers.
pub const CLOSE_TICKERS: [(&str, &str); 2] = [("XCU", "HG.F"), ("ALU", "AL.F")];

/// Every tracked symbol.
pub const ALL_SYMBOLS: [&str; 6] = ["XAU", "XAG", "XPD", "XPT", "XCU", "ALU"];

#[derive(Debug)]
pub struct UpdateOutcome {
    /// True when the gate short-circuited the run (no fetch happened).
    pub skipped: bool,
    pub saved: Vec<(String, NaiveDate, f64)>,
}

pub fn run_update(
    store: &dyn SeriesStore,
    rates: &dyn RatesSource,
    closes: &dyn DailyCloseSource,
    base: &str,
    force: bool,
) -> Result<UpdateOutcome, FeedError> {
    if !force {
        if let Some(meta) = store.load_meta()? {
            if meta.already_updated_today(today_utc()) {
                log::info!("already updated today (UTC), skipping fetch");
                return Ok(UpdateOutcome {
                    skipped: true,
                    saved: Vec::new(),
                });
            }
        }
    }

    let mut saved = Vec::new();
    let mut sources = BTreeMap::new();

    // Precious metals: one batched call, one effective date for the batch.
    let latest = rates.fetch_latest(&RATES_SYMBOLS, base)?;
    for (symbol, rate) in &latest.rates {
        upsert_into_store(store, symbol, Point::new(latest.date, rate.value))?;
        log::info!("saved {symbol} @ {} (rates key={})", latest.date, rate.key);
        saved.push((symbol.clone(), latest.date, rate.value));
    }
    sources.insert(
        "MetalpriceAPI".to_string(),
        serde_json::json!({ "symbols": RATES_SYMBOLS, "date": latest.date.to_string() }),
    );

    // Copper and aluminum: strictly sequential per-ticker closes. Their dates
    // follow the exchange calendar and may differ from the rates date, so the
    // source's own date is stored.
    for (symbol, ticker) in CLOSE_TICKERS {
        let (date, close) = closes.fetch_daily_close(ticker)?;
        upsert_into_store(store, symbol, Point::new(date, close))?;
        log::info!("saved {symbol} @ {date} (ticker={ticker})");
        saved.push((symbol.to_string(), date, close));
    }
    sources.insert(
        "Stooq".to_string(),
        serde_json::json!({ "tickers": CLOSE_TICKERS }),
    );

    let meta = Meta::for_run(
        ALL_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        base,
        "Daily update: rates API (XAU/XAG/XPD/XPT) + CSV futures closes (XCU/ALU). \
         Cached max 1 run/day UTC.",
        sources,
    );
    store.save_meta(&meta)?;

    Ok(UpdateOutcome {
        skipped: false,
        saved,
    })
}

fn upsert_into_store(
    store: &dyn SeriesStore,
    symbol: &str,
    point: Point,
) -> Result<(), FeedError> {
    let mut series = store.load(symbol)?;
    upsert_point(&mut series, point);
    store.save(symbol, &series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{LatestRates, ResolvedRate, TimeframeRates};
    use crate::store::MemStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    struct FakeRates {
        calls: AtomicUsize,
        date: NaiveDate,
        values: Vec<(&'static str, f64)>,
    }

    impl FakeRates {
        fn new(date: NaiveDate, values: Vec<(&'static str, f64)>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                date,
                values,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl RatesSource for FakeRates {
        fn fetch_latest(&self, _symbols: &[&str], _base: &str) -> Result<LatestRates, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let rates = self
                .values
                .iter()
                .map(|&(sym, value)| {
                    (
                        sym.to_string(),
                        ResolvedRate {
                            value,
                            key: sym.to_string(),
                        },
                    )
                })
                .collect();
            Ok(LatestRates {
                date: self.date,
                rates,
            })
        }

        fn fetch_timeframe(
            &self,
            _symbols: &[&str],
            _base: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<TimeframeRates, FeedError> {
            Ok(TimeframeRates::new())
        }
    }

    struct FakeCloses {
        calls: AtomicUsize,
        date: NaiveDate,
        close: f64,
        fail: bool,
    }

    impl FakeCloses {
        fn new(date: NaiveDate, close: f64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                date,
                close,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(NaiveDate::default(), 0.0)
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl DailyCloseSource for FakeCloses {
        fn fetch_daily_close(&self, ticker: &str) -> Result<(NaiveDate, f64), FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FeedError::Shape(format!("HTML instead of CSV for {ticker}")));
            }
            Ok((self.date, self.close))
        }
    }

    #[test]
    fn update_upserts_batch_and_closes() {
        let store = MemStore::new();
        let rates = FakeRates::new(d("2024-01-02"), vec![("XAU", 2050.5), ("XAG", 23.4)]);
        let closes = FakeCloses::new(d("2024-01-03"), 3.88);

        let outcome = run_update(&store, &rates, &closes, "USD", false).unwrap();

        assert!(!outcome.skipped);
        assert_eq!(rates.call_count(), 1);
        // One call per mapped ticker
        assert_eq!(closes.call_count(), CLOSE_TICKERS.len());

        assert_eq!(store.series("XAU"), vec![Point::new(d("2024-01-02"), 2050.5)]);
        assert_eq!(store.series("XAG"), vec![Point::new(d("2024-01-02"), 23.4)]);
        // CSV symbols carry their source's own date
        assert_eq!(store.series("XCU"), vec![Point::new(d("2024-01-03"), 3.88)]);
        assert_eq!(store.series("ALU"), vec![Point::new(d("2024-01-03"), 3.88)]);

        let meta = store.meta().unwrap();
        assert_eq!(meta.base, "USD");
        assert_eq!(meta.symbols.len(), ALL_SYMBOLS.len());
        assert!(meta.sources.contains_key("MetalpriceAPI"));
        assert!(meta.sources.contains_key("Stooq"));
    }

    #[test]
    fn gate_skips_second_run_same_day() {
        let store = MemStore::new();
        let rates = FakeRates::new(d("2024-01-02"), vec![("XAU", 2050.5)]);
        let closes = FakeCloses::new(d("2024-01-02"), 3.88);

        let first = run_update(&store, &rates, &closes, "USD", false).unwrap();
        assert!(!first.skipped);
        let xau_after_first = store.series("XAU");

        let second = run_update(&store, &rates, &closes, "USD", false).unwrap();
        assert!(second.skipped);
        // No second network call, series untouched
        assert_eq!(rates.call_count(), 1);
        assert_eq!(closes.call_count(), CLOSE_TICKERS.len());
        assert_eq!(store.series("XAU"), xau_after_first);
    }

    #[test]
    fn force_bypasses_gate() {
        let store = MemStore::new();
        let rates = FakeRates::new(d("2024-01-02"), vec![("XAU", 2050.5)]);
        let closes = FakeCloses::new(d("2024-01-02"), 3.88);

        run_update(&store, &rates, &closes, "USD", false).unwrap();
        let again = run_update(&store, &rates, &closes, "USD", true).unwrap();

        assert!(!again.skipped);
        assert_eq!(rates.call_count(), 2);
    }

    #[test]
    fn repeated_forced_runs_do_not_grow_series() {
        let store = MemStore::new();
        let rates = FakeRates::new(d("2024-01-02"), vec![("XAU", 2050.5)]);
        let closes = FakeCloses::new(d("2024-01-02"), 3.88);

        run_update(&store, &rates, &closes, "USD", true).unwrap();
        run_update(&store, &rates, &closes, "USD", true).unwrap();

        assert_eq!(store.series("XAU").len(), 1);
        assert_eq!(store.series("XCU").len(), 1);
    }

    #[test]
    fn failed_close_fetch_aborts_without_meta() {
        let store = MemStore::new();
        let rates = FakeRates::new(d("2024-01-02"), vec![("XAU", 2050.5)]);
        let closes = FakeCloses::failing();

        let err = run_update(&store, &rates, &closes, "USD", false).unwrap_err();
        assert!(matches!(err, FeedError::Shape(_)));

        // Rates already persisted before the abort; meta never written, so
        // the next run is not gated out.
        assert_eq!(store.series("XAU").len(), 1);
        assert!(store.meta().is_none());
    }

    #[test]
    fn update_merges_into_existing_history() {
        let store = MemStore::new();
        store
            .save(
                "XAU",
                &[
                    Point::new(d("2024-01-01"), 2040.0),
                    Point::new(d("2024-01-02"), 2045.0),
                ],
            )
            .unwrap();

        let rates = FakeRates::new(d("2024-01-02"), vec![("XAU", 2050.5)]);
        let closes = FakeCloses::new(d("2024-01-02"), 3.88);
        run_update(&store, &rates, &closes, "USD", false).unwrap();

        assert_eq!(
            store.series("XAU"),
            vec![
                Point::new(d("2024-01-01"), 2040.0),
                Point::new(d("2024-01-02"), 2050.5),
            ]
        );
    }
}
