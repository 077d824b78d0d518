//! metalfeed core — daily metal price feed.
//!
//! This crate contains everything behind the CLI:
//! - Series model and the upsert / backfill merge engine
//! - JSON file store with a trait seam for tests
//! - Run metadata and the once-per-UTC-day gate
//! - Source adapters: batched rates API + per-ticker CSV daily closes
//! - The `update` and `backfill` orchestrators

pub mod backfill;
pub mod config;
pub mod meta;
pub mod metalprice;
pub mod provider;
pub mod series;
pub mod stooq;
pub mod store;
pub mod update;

pub use provider::FeedError;
