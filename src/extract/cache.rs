//! Caching wrapper: file cache of extracted params + daily limit on real calls.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::ParamExtractor;
use crate::intake::QaPair;
use crate::score::RawParams;

pub fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache/ai")
}

/// Counter state is guarded by a `Mutex` and persisted next to the cache.
pub struct CachedExtractor<P: ParamExtractor> {
    inner: P,
    cache_dir: PathBuf,
    daily_limit_max: u32,
    counter: Arc<Mutex<DailyCounter>>,
}

impl<P: ParamExtractor> CachedExtractor<P> {
    pub fn new(inner: P, cache_dir: PathBuf, daily_limit_max: u32) -> Self {
        let _ = fs::create_dir_all(&cache_dir); // best-effort
        let counter = Arc::new(Mutex::new(
            load_daily_counter(&cache_dir).unwrap_or_default(),
        ));
        Self {
            inner,
            cache_dir,
            daily_limit_max,
            counter,
        }
    }

    /// Real calls made today.
    pub fn calls_today(&self) -> u32 {
        let mut g = self.counter.lock().unwrap_or_else(|e| e.into_inner());
        g.roll_over();
        g.count
    }

    /// Check the limit; on success, count one real call.
    fn take_call(&self) -> bool {
        let mut g = self.counter.lock().unwrap_or_else(|e| e.into_inner());
        g.roll_over();
        if g.count >= self.daily_limit_max {
            return false;
        }
        g.count = g.count.saturating_add(1);
        if let Err(e) = save_daily_counter(&self.cache_dir, &g) {
            debug!(error = %e, "failed to persist daily counter");
        }
        true
    }
}

#[async_trait]
impl<P: ParamExtractor> ParamExtractor for CachedExtractor<P> {
    async fn extract(&self, idea: &str, answers: &[QaPair]) -> Option<RawParams> {
        let key = cache_key(idea, answers);
        if let Some(hit) = read_cache_file(&self.cache_dir, &key) {
            debug!(%key, "extraction cache hit");
            return Some(hit);
        }

        if !self.take_call() {
            warn!(limit = self.daily_limit_max, "daily model call limit reached");
            return None;
        }

        let fresh = self.inner.extract(idea, answers).await?;
        if let Err(e) = write_cache_file(&self.cache_dir, &key, &fresh) {
            debug!(error = %e, "failed to write extraction cache");
        }
        Some(fresh)
    }

    async fn feedback(&self, idea: &str, score: &str) -> Option<String> {
        if !self.take_call() {
            return None;
        }
        self.inner.feedback(idea, score).await
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }
}

// ------------------------------------------------------------
// File cache helpers
// ------------------------------------------------------------

fn cache_key(idea: &str, answers: &[QaPair]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(idea.as_bytes());
    for qa in answers {
        hasher.update([0u8]);
        hasher.update(qa.id.as_deref().unwrap_or("").as_bytes());
        hasher.update([0u8]);
        hasher.update(qa.question.as_bytes());
        hasher.update([0u8]);
        hasher.update(qa.answer.as_bytes());
    }
    hasher
        .finalize()
        .iter()
        .take(16)
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file(dir: &Path, key: &str) -> Option<RawParams> {
    let s = fs::read_to_string(cache_path(dir, key)).ok()?;
    serde_json::from_str(&s).ok()
}

fn write_cache_file(dir: &Path, key: &str, value: &RawParams) -> io::Result<()> {
    let path = cache_path(dir, key);
    write_atomic(&path, &serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string()))
}

fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(content.as_bytes())?;
    fs::rename(tmp, path)
}

// ------------------------------------------------------------
// Daily counter helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCounter {
    date: String,
    count: u32,
}

impl Default for DailyCounter {
    fn default() -> Self {
        Self {
            date: today(),
            count: 0,
        }
    }
}

impl DailyCounter {
    fn roll_over(&mut self) {
        let t = today();
        if self.date != t {
            self.date = t;
            self.count = 0;
        }
    }
}

fn today() -> String {
    chrono::Utc::now().date_naive().to_string()
}

fn counter_path(dir: &Path) -> PathBuf {
    dir.join("daily_count.json")
}

fn load_daily_counter(dir: &Path) -> io::Result<DailyCounter> {
    let s = fs::read_to_string(counter_path(dir))?;
    serde_json::from_str(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn save_daily_counter(dir: &Path, dc: &DailyCounter) -> io::Result<()> {
    let s = serde_json::to_string(dc).unwrap_or_else(|_| "{}".to_string());
    write_atomic(&counter_path(dir), &s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::MockExtractor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn unique_tmp_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        dir.push(format!("extract_cache_{nanos}"));
        dir
    }

    struct Counting {
        calls: AtomicUsize,
        inner: MockExtractor,
    }

    #[async_trait]
    impl ParamExtractor for Counting {
        async fn extract(&self, idea: &str, answers: &[QaPair]) -> Option<RawParams> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.extract(idea, answers).await
        }
        fn provider_name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn cache_hits_skip_provider_and_limit() {
        let dir = unique_tmp_dir();
        let c = CachedExtractor::new(
            Counting {
                calls: AtomicUsize::new(0),
                inner: MockExtractor::default(),
            },
            dir.clone(),
            2,
        );

        assert!(c.extract("idea one", &[]).await.is_some());
        assert!(c.extract("idea one", &[]).await.is_some());
        assert_eq!(c.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(c.calls_today(), 1);

        assert!(c.extract("idea two", &[]).await.is_some());
        // Limit of 2 reached: a new idea is refused, cached ones still served.
        assert!(c.extract("idea three", &[]).await.is_none());
        assert!(c.extract("idea two", &[]).await.is_some());
        assert_eq!(c.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(c.provider_name(), "counting");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn cache_key_depends_on_answers() {
        let a = cache_key("idea", &[]);
        let b = cache_key(
            "idea",
            &[QaPair {
                id: Some("reach".into()),
                question: String::new(),
                answer: "10".into(),
            }],
        );
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }
}
