//! Log of scored ideas: capped in-memory list for diagnostics,
//! optionally mirrored to a JSONL file.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::score::{RiceInputs, ScoreMode};

pub const DEFAULT_RESULTS_PATH: &str = "data/results.jsonl";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredIdea {
    pub ts: DateTime<Utc>,
    pub idea_id: String,
    pub idea: String,
    pub inputs: RiceInputs,
    pub raw: f64,
    /// "63.4%" in adaptive mode, "0.3452" in raw mode.
    pub score: String,
    pub mode: ScoreMode,
    pub provider: String,
}

#[derive(Debug)]
pub struct ResultLog {
    inner: Mutex<Vec<ScoredIdea>>,
    cap: usize,
    file: Option<PathBuf>,
}

impl ResultLog {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.clamp(1, 10_000);
        Self {
            inner: Mutex::new(Vec::with_capacity(cap)),
            cap,
            file: None,
        }
    }

    /// Also append every entry as one JSON line to `path`.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn push(&self, entry: ScoredIdea) {
        if let Some(path) = &self.file {
            if let Err(e) = append_line(path, &entry) {
                warn!(path = %path.display(), error = %e, "failed to append result log");
            }
        }

        let mut v = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        v.push(entry);
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
    }

    pub fn snapshot_last_n(&self, n: usize) -> Vec<ScoredIdea> {
        let v = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let start = v.len().saturating_sub(n);
        v[start..].to_vec()
    }
}

fn append_line(path: &Path, entry: &ScoredIdea) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let line = serde_json::to_string(entry)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(f, "{line}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(i: usize) -> ScoredIdea {
        ScoredIdea {
            ts: Utc::now(),
            idea_id: format!("{i:012x}"),
            idea: format!("idea {i}"),
            inputs: RiceInputs::default(),
            raw: i as f64 / 100.0,
            score: "50.0%".into(),
            mode: ScoreMode::Adaptive,
            provider: "mock".into(),
        }
    }

    #[test]
    fn keeps_newest_entries() {
        let log = ResultLog::with_capacity(2);
        for i in 0..5 {
            log.push(entry(i));
        }
        let last = log.snapshot_last_n(10);
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].idea, "idea 3");
        assert_eq!(log.snapshot_last_n(1)[0].idea, "idea 4");
    }

    #[test]
    fn mirrors_to_jsonl() {
        let mut dir = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        dir.push(format!("results_test_{nanos}"));
        let path = dir.join("results.jsonl");

        let log = ResultLog::with_capacity(10).with_file(&path);
        log.push(entry(1));
        log.push(entry(2));

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let back: ScoredIdea = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(back.idea, "idea 2");
        let _ = fs::remove_dir_all(&dir);
    }
}
