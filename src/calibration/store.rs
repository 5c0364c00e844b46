//! Storage backends for the raw magnitude history.
//!
//! `FileStore` persists a JSON array of numbers and serializes the
//! read-append-truncate-persist cycle behind a lock so concurrent scoring
//! calls cannot drop each other's entries. The lock is shared by every
//! handle on the same path within the process. `MemoryStore` keeps the same
//! semantics without touching disk.

use std::{
    collections::HashMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use metrics::counter;
use once_cell::sync::Lazy;
use tracing::{debug, warn};

use super::{truncate_front, CalibrationStore, DEFAULT_CAPACITY};

pub const DEFAULT_HISTORY_PATH: &str = "data/raw_history.json";

/// One writer lock per history file, keyed by absolute path.
static PATH_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn lock_for(path: &Path) -> Arc<Mutex<()>> {
    let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut locks = PATH_LOCKS.lock().unwrap_or_else(|e| e.into_inner());
    locks.entry(key).or_default().clone()
}

/// In-memory history (tests, demos, embedded use).
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Vec<f64>>,
    cap: usize,
}

impl MemoryStore {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            inner: Mutex::new(Vec::with_capacity(cap.min(10_000))),
            cap,
        }
    }

    /// Seed with existing values (truncated to the cap).
    pub fn from_values(values: impl IntoIterator<Item = f64>, cap: usize) -> Self {
        let store = Self::with_capacity(cap);
        {
            let mut v = store.inner.lock().unwrap_or_else(|e| e.into_inner());
            v.extend(values.into_iter().filter(|x| x.is_finite()));
            truncate_front(&mut v, store.cap);
        }
        store
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl CalibrationStore for MemoryStore {
    fn history(&self) -> Vec<f64> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, raw: f64) {
        if !raw.is_finite() {
            debug!(raw, "skipping non-finite raw magnitude");
            return;
        }
        let mut v = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        v.push(raw);
        truncate_front(&mut v, self.cap);
    }
}

/// JSON-file history, re-read on every access.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    cap: usize,
    lock: Arc<Mutex<()>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>, cap: usize) -> Self {
        let path = path.into();
        let lock = lock_for(&path);
        Self {
            path,
            cap: cap.max(1),
            lock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fallible append; `record` wraps this and swallows the error.
    pub fn append(&self, raw: f64) -> io::Result<()> {
        if !raw.is_finite() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "raw magnitude is not finite",
            ));
        }
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut history = self.read_or_empty();
        history.push(raw);
        truncate_front(&mut history, self.cap);
        write_history(&self.path, &history)
    }

    fn read_or_empty(&self) -> Vec<f64> {
        match read_history(&self.path) {
            Ok(v) => v,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    debug!(path = %self.path.display(), error = %e, "history unreadable, treating as empty");
                }
                Vec::new()
            }
        }
    }
}

impl CalibrationStore for FileStore {
    fn history(&self) -> Vec<f64> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.read_or_empty()
    }

    fn record(&self, raw: f64) {
        if let Err(e) = self.append(raw) {
            warn!(path = %self.path.display(), error = %e, "failed to persist raw magnitude history");
            counter!("calibration_record_failures_total").increment(1);
        }
    }
}

/// Read the persisted list. Non-finite entries cannot occur in valid JSON,
/// but nulls or strings make the whole file invalid.
pub fn read_history(path: &Path) -> io::Result<Vec<f64>> {
    let s = fs::read_to_string(path)?;
    serde_json::from_str::<Vec<f64>>(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Write via a temp file + rename so readers never see a half-written list.
pub fn write_history(path: &Path, values: &[f64]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(values)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(json.as_bytes())?;
    f.sync_all()?;
    fs::rename(tmp, path)?;
    Ok(())
}
