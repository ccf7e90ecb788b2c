//! Persisted memo of LLM outputs, keyed by job id.
//!
//! Skill-fit and proposal generation are cached independently: an entry may
//! carry a skill score but no proposal yet. A populated field is authoritative
//! and suppresses the matching LLM call; an empty one only triggers that phase.

use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to replace cache file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("cache writer task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(default)]
    pub skill_fit_score: Option<f64>,
    #[serde(default)]
    pub skill_analysis: String,
    #[serde(default)]
    pub proposal_greeting: String,
    #[serde(default)]
    pub delivery_estimate: String,
    #[serde(default)]
    pub specification_questions: String,
    /// Entries written without a timestamp load as the Unix epoch.
    #[serde(default)]
    pub processed_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn empty(processed_at: DateTime<Utc>) -> Self {
        Self {
            skill_fit_score: None,
            skill_analysis: String::new(),
            proposal_greeting: String::new(),
            delivery_estimate: String::new(),
            specification_questions: String::new(),
            processed_at,
        }
    }

    pub fn has_skill_fit(&self) -> bool {
        self.skill_fit_score.is_some()
    }

    /// The proposal phase is complete only once a greeting exists.
    pub fn has_proposal(&self) -> bool {
        !self.proposal_greeting.trim().is_empty()
    }
}

/// Ordered so the persisted file diffs cleanly between runs.
pub type CacheMap = BTreeMap<String, CacheEntry>;

/// Storage backend for the cache. Constructed once per batch run and passed
/// to the pipeline explicitly.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Reads the whole store. A missing or corrupt store yields an empty map.
    async fn load(&self) -> CacheMap;

    /// Replaces the whole store with `entries`. Concurrent saves are serialized.
    async fn save(&self, entries: &CacheMap) -> Result<(), CacheError>;
}

// ────────────────────────────────────────────────────────────────────────────
// JsonFileCache: default on-disk backend
// ────────────────────────────────────────────────────────────────────────────

/// Single JSON file, rewritten through a temp file + rename so readers never
/// see a half-written snapshot.
pub struct JsonFileCache {
    path: PathBuf,
    save_lock: tokio::sync::Mutex<()>,
}

impl JsonFileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            save_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResultCache for JsonFileCache {
    async fn load(&self) -> CacheMap {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No result cache yet, starting cold");
                return CacheMap::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Result cache unreadable, starting cold");
                return CacheMap::new();
            }
        };

        let raw = match serde_json::from_slice::<BTreeMap<String, serde_json::Value>>(&bytes) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Result cache corrupt, starting cold");
                return CacheMap::new();
            }
        };

        // One bad entry costs one job's LLM calls, not the whole cache.
        let entries: CacheMap = raw
            .into_iter()
            .filter_map(|(job_id, value)| match serde_json::from_value(value) {
                Ok(entry) => Some((job_id, entry)),
                Err(e) => {
                    warn!(path = %self.path.display(), job_id = %job_id, error = %e, "Dropping malformed cache entry");
                    None
                }
            })
            .collect();
        info!(path = %self.path.display(), entries = entries.len(), "Loaded result cache");
        entries
    }

    async fn save(&self, entries: &CacheMap) -> Result<(), CacheError> {
        let _guard = self.save_lock.lock().await;

        let body = serde_json::to_vec_pretty(entries)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &body))
            .await
            .map_err(|e| CacheError::Task(e.to_string()))??;

        debug!(path = %self.path.display(), entries = entries.len(), "Saved result cache");
        Ok(())
    }
}

/// Writes `body` next to `path` and renames it into place.
pub(crate) fn write_atomically(path: &Path, body: &[u8]) -> Result<(), CacheError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(body)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// MemoryCache: in-process backend for dry runs and tests
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<CacheMap>,
    saves: AtomicUsize,
}

impl MemoryCache {
    pub fn with_entries(entries: CacheMap) -> Self {
        Self {
            entries: Mutex::new(entries),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn snapshot(&self) -> CacheMap {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn load(&self) -> CacheMap {
        self.snapshot()
    }

    async fn save(&self, entries: &CacheMap) -> Result<(), CacheError> {
        *self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = entries.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> CacheEntry {
        CacheEntry {
            skill_fit_score: Some(8.5),
            skill_analysis: "Rust と TypeScript の経験が合致".to_string(),
            proposal_greeting: String::new(),
            delivery_estimate: String::new(),
            specification_questions: String::new(),
            processed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonFileCache::new(dir.path().join("nope.json"));
        assert!(cache.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, b"{ this is not json").unwrap();

        let cache = JsonFileCache::new(&path);
        assert!(cache.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_reproduces_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        let cache = JsonFileCache::new(&path);

        let mut entries = CacheMap::new();
        entries.insert("crowdworks:1".to_string(), sample_entry());
        cache.save(&entries).await.unwrap();

        let reloaded = JsonFileCache::new(&path).load().await;
        assert_eq!(reloaded, entries);
    }

    #[tokio::test]
    async fn test_save_replaces_whole_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonFileCache::new(dir.path().join("cache.json"));

        let mut first = CacheMap::new();
        first.insert("a".to_string(), sample_entry());
        first.insert("b".to_string(), sample_entry());
        cache.save(&first).await.unwrap();

        let mut second = CacheMap::new();
        second.insert("c".to_string(), sample_entry());
        cache.save(&second).await.unwrap();

        let keys: Vec<_> = cache.load().await.into_keys().collect();
        assert_eq!(keys, vec!["c".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_saves_leave_a_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonFileCache::new(dir.path().join("cache.json"));

        let snapshots: Vec<CacheMap> = (0..4)
            .map(|i| {
                let mut map = CacheMap::new();
                map.insert(format!("job:{i}"), sample_entry());
                map
            })
            .collect();
        let results = futures::future::join_all(snapshots.iter().map(|s| cache.save(s))).await;
        assert!(results.iter().all(|r| r.is_ok()));

        assert_eq!(cache.load().await.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_entry_does_not_discard_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(
            &path,
            r#"{
                "crowdworks:1": {"skill_fit_score": 8.0, "processed_at": "2026-10-01T09:00:00Z"},
                "crowdworks:2": {"skill_fit_score": 6.5, "skill_analysis": "no timestamp"},
                "crowdworks:3": {"skill_fit_score": "high", "processed_at": "2026-10-01T09:00:00Z"}
            }"#,
        )
        .unwrap();

        let entries = JsonFileCache::new(&path).load().await;
        let keys: Vec<_> = entries.keys().cloned().collect();
        assert_eq!(keys, vec!["crowdworks:1".to_string(), "crowdworks:2".to_string()]);
        assert_eq!(entries["crowdworks:2"].skill_fit_score, Some(6.5));
        assert_eq!(entries["crowdworks:2"].processed_at, DateTime::<Utc>::default());
    }

    #[test]
    fn test_partial_entry_deserializes_with_defaults() {
        let json = r#"{"skill_fit_score": 7.0, "processed_at": "2026-10-01T09:00:00Z"}"#;
        let entry: CacheEntry = serde_json::from_str(json).unwrap();
        assert!(entry.has_skill_fit());
        assert!(!entry.has_proposal());
    }

    #[test]
    fn test_blank_greeting_is_not_a_proposal() {
        let mut entry = CacheEntry::empty(Utc::now());
        entry.proposal_greeting = "   ".to_string();
        assert!(!entry.has_proposal());
        assert!(!entry.has_skill_fit());
    }

    #[tokio::test]
    async fn test_memory_cache_counts_saves() {
        let cache = MemoryCache::default();
        let mut entries = CacheMap::new();
        entries.insert("x".to_string(), sample_entry());
        cache.save(&entries).await.unwrap();
        assert_eq!(cache.save_count(), 1);
        assert_eq!(cache.load().await, entries);
    }
}
