use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::StorageError;

/// Synchronous string key-value storage with the semantics of browser
/// local storage: no transactions, writes may fail (quota, io).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    fn keys(&self) -> Vec<String>;
}

pub type SharedStore = Arc<dyn KeyValueStore>;

fn map_size(map: &BTreeMap<String, String>) -> usize {
    map.iter().map(|(k, v)| k.len() + v.len()).sum()
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects writes once keys plus values exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
            quota: Some(bytes),
        }
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(self)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.write().map_err(|_| StorageError::Poisoned)?;
        if let Some(limit) = self.quota {
            let current = inner.get(key).map(|old| key.len() + old.len()).unwrap_or(0);
            let needed = map_size(&inner) - current + key.len() + value.len();
            if needed > limit {
                return Err(StorageError::QuotaExceeded { needed, limit });
            }
        }
        inner.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.write().map_err(|_| StorageError::Poisoned)?;
        inner.remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.inner
            .read()
            .map(|inner| inner.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Key-value store persisted as a single JSON object on disk.
#[derive(Debug)]
pub struct FileStore {
    inner: RwLock<BTreeMap<String, String>>,
    path: PathBuf,
}

impl FileStore {
    /// Opens (or starts) the store at `path`. A corrupt file falls back to
    /// the `.json.tmp` sibling left by an interrupted write, then to empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let data: BTreeMap<String, String> = read_json_with_tmp_fallback(&path);
        debug!(path = %path.display(), keys = data.len(), "opened file store");
        Self {
            inner: RwLock::new(data),
            path,
        }
    }

    pub fn open_in_dir(dir: impl AsRef<Path>) -> Self {
        Self::open(dir.as_ref().join("store.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(self)
    }

    fn persist(&self, data: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(data)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Atomic replace
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update<F>(&self, apply: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut inner = self.inner.write().map_err(|_| StorageError::Poisoned)?;
        let mut next = inner.clone();
        apply(&mut next);
        if let Err(err) = self.persist(&next) {
            warn!(error = %err, path = %self.path.display(), "failed to persist store");
            return Err(err);
        }
        *inner = next;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|map| {
            map.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|map| {
            map.remove(key);
        })
    }

    fn keys(&self) -> Vec<String> {
        self.inner
            .read()
            .map(|inner| inner.keys().cloned().collect())
            .unwrap_or_default()
    }
}

fn read_json_with_tmp_fallback<T: DeserializeOwned + Default>(path: &Path) -> T {
    match std::fs::read(path) {
        Ok(bytes) => match serde_json::from_slice::<T>(&bytes) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "failed to parse JSON, trying tmp fallback");
                let tmp = path.with_extension("json.tmp");
                match std::fs::read(&tmp) {
                    Ok(tmp_bytes) => serde_json::from_slice::<T>(&tmp_bytes).unwrap_or_default(),
                    Err(_) => T::default(),
                }
            }
        },
        Err(_) => T::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_enforces_quota_without_touching_existing_data() {
        let store = MemoryStore::with_quota(16);
        store.set("a", "12345").unwrap();
        let err = store.set("b", "0123456789abcdef").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { limit: 16, .. }));
        assert_eq!(store.get("a").as_deref(), Some("12345"));
        assert!(store.get("b").is_none());

        // Replacing a value only counts the new size.
        store.set("a", "1234567890").unwrap();
        assert_eq!(store.keys(), vec!["a".to_string()]);
    }

    #[test]
    fn memory_store_remove_missing_key_is_ok() {
        let store = MemoryStore::new();
        assert!(store.remove("nothing").is_ok());
        assert!(store.get("nothing").is_none());
    }
}
