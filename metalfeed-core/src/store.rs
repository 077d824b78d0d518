//! Series storage: one JSON array per symbol plus a meta sidecar.
//!
//! The store is a trait so the orchestrators take it as an injected
//! dependency; `JsonStore` is the real filesystem implementation and
//! `MemStore` backs the orchestrator tests.

use crate::meta::Meta;
use crate::provider::FeedError;
use crate::series::Point;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait SeriesStore {
    /// Load a symbol's series. A symbol with no stored data is an empty series.
    fn load(&self, symbol: &str) -> Result<Vec<Point>, FeedError>;

    /// Persist a symbol's full series, replacing whatever was stored.
    fn save(&self, symbol: &str, series: &[Point]) -> Result<(), FeedError>;

    fn load_meta(&self) -> Result<Option<Meta>, FeedError>;

    fn save_meta(&self, meta: &Meta) -> Result<(), FeedError>;
}

/// Filesystem store: `{dir}/{SYMBOL}.json` per series, `{dir}/meta.json`.
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn series_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.json"))
    }

    fn meta_path(&self) -> PathBuf {
        self.dir.join("meta.json")
    }

    /// Write to a .tmp sibling, then rename into place.
    fn write_atomic(&self, path: &Path, contents: &str) -> Result<(), FeedError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| FeedError::Store(format!("create {}: {e}", self.dir.display())))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents)
            .map_err(|e| FeedError::Store(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            FeedError::Store(format!("atomic rename to {}: {e}", path.display()))
        })
    }
}

impl SeriesStore for JsonStore {
    fn load(&self, symbol: &str) -> Result<Vec<Point>, FeedError> {
        let path = self.series_path(symbol);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| FeedError::Store(format!("read {}: {e}", path.display())))?;
        // A junk or non-array file counts as an empty series; the next save
        // rewrites the file wholesale.
        Ok(serde_json::from_str(&content).unwrap_or_default())
    }

    fn save(&self, symbol: &str, series: &[Point]) -> Result<(), FeedError> {
        let json = serde_json::to_string(series)
            .map_err(|e| FeedError::Store(format!("serialize {symbol}: {e}")))?;
        self.write_atomic(&self.series_path(symbol), &json)
    }

    fn load_meta(&self) -> Result<Option<Meta>, FeedError> {
        let path = self.meta_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| FeedError::Store(format!("read {}: {e}", path.display())))?;
        Ok(serde_json::from_str(&content).ok())
    }

    fn save_meta(&self, meta: &Meta) -> Result<(), FeedError> {
        let json = serde_json::to_string_pretty(meta)
            .map_err(|e| FeedError::Store(format!("serialize meta: {e}")))?;
        self.write_atomic(&self.meta_path(), &json)
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<MemInner>,
}

#[derive(Default)]
struct MemInner {
    series: BTreeMap<String, Vec<Point>>,
    meta: Option<Meta>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn series(&self, symbol: &str) -> Vec<Point> {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .series
            .get(symbol)
            .cloned()
            .unwrap_or_default()
    }

    pub fn meta(&self) -> Option<Meta> {
        self.inner.lock().expect("store mutex poisoned").meta.clone()
    }
}

impl SeriesStore for MemStore {
    fn load(&self, symbol: &str) -> Result<Vec<Point>, FeedError> {
        Ok(self.series(symbol))
    }

    fn save(&self, symbol: &str, series: &[Point]) -> Result<(), FeedError> {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .series
            .insert(symbol.to_string(), series.to_vec());
        Ok(())
    }

    fn load_meta(&self) -> Result<Option<Meta>, FeedError> {
        Ok(self.meta())
    }

    fn save_meta(&self, meta: &Meta) -> Result<(), FeedError> {
        self.inner.lock().expect("store mutex poisoned").meta = Some(meta.clone());
        Ok(())
    }
}
