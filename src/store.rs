// src/store.rs
//! Opaque key-value persistence collaborator.
//!
//! `set` stages a write; `commit` applies the staged batch atomically, so
//! readers never observe a half-written multi-key update (the pipeline's
//! feed + last-update pair, the gate's cooldown stamp).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};

/// Serialized feed array (the display layer's input).
pub const EVENT_DATA_KEY: &str = "earthquake_data";
/// Epoch millis of the last completed pipeline run.
pub const LAST_UPDATE_KEY: &str = "last_update";
/// Epoch millis of the last gate-approved refresh attempt.
pub const LAST_REFRESH_KEY: &str = "last_refresh_time";

pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    /// Stage a write; not visible to readers until [`KvStore::commit`].
    fn set(&self, key: &str, value: &str);
    /// Atomically apply every staged write.
    fn commit(&self) -> Result<()>;
}

#[derive(Debug, Default)]
struct StoreState {
    committed: HashMap<String, String>,
    staged: Vec<(String, String)>,
}

impl StoreState {
    fn apply_staged(&mut self) {
        let staged = std::mem::take(&mut self.staged);
        for (k, v) in staged {
            self.committed.insert(k, v);
        }
    }
}

/// In-memory store for tests and embedding hosts that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        inner.committed.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.staged.push((key.to_string(), value.to_string()));
    }

    fn commit(&self) -> Result<()> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.apply_staged();
        Ok(())
    }
}

/// File-backed store for the daemon: one JSON object per file, committed via
/// temp-file + rename so a crash mid-write leaves the previous state intact.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: Mutex<StoreState>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let committed = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("parsing store at {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("reading store at {}", path.display()))
            }
        };
        Ok(Self {
            path,
            inner: Mutex::new(StoreState {
                committed,
                staged: Vec::new(),
            }),
        })
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        inner.committed.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.staged.push((key.to_string(), value.to_string()));
    }

    fn commit(&self) -> Result<()> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.apply_staged();

        let payload =
            serde_json::to_string_pretty(&inner.committed).context("serializing store")?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, payload)
            .with_context(|| format!("writing store at {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing store at {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_writes_invisible_until_commit() {
        let store = MemoryStore::new();
        store.set("k", "v1");
        assert_eq!(store.get("k"), None);
        store.commit().unwrap();
        assert_eq!(store.get("k"), Some("v1".to_string()));

        store.set("k", "v2");
        assert_eq!(store.get("k"), Some("v1".to_string()));
        store.commit().unwrap();
        assert_eq!(store.get("k"), Some("v2".to_string()));
    }

    #[test]
    fn multi_key_batch_lands_together() {
        let store = MemoryStore::new();
        store.set(EVENT_DATA_KEY, "[]");
        store.set(LAST_UPDATE_KEY, "123");
        assert_eq!(store.get(EVENT_DATA_KEY), None);
        assert_eq!(store.get(LAST_UPDATE_KEY), None);
        store.commit().unwrap();
        assert_eq!(store.get(EVENT_DATA_KEY), Some("[]".to_string()));
        assert_eq!(store.get(LAST_UPDATE_KEY), Some("123".to_string()));
    }
}
