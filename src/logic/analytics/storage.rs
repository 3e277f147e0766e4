//! Key-Value Stores
//!
//! Local-storage stand-ins for the persisted event buffer.
//! - `MemoryStore` - in-process map with an optional byte quota
//! - `FileStore` - one `<key>.json` file per key in a directory

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use super::error::{AnalyticsError, AnalyticsResult};

/// String key-value storage, addressed by fixed keys
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> AnalyticsResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AnalyticsResult<()>;
    /// Removing a missing key is not an error
    fn remove(&self, key: &str) -> AnalyticsResult<()>;
}

// ============================================================================
// MEMORY STORE
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes of keys plus values may not exceed `quota_bytes`
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    fn used_bytes_excluding(entries: &HashMap<String, String>, key: &str) -> usize {
        entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> AnalyticsResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AnalyticsResult<()> {
        let mut entries = self.entries.write();

        if let Some(limit) = self.quota_bytes {
            let needed = Self::used_bytes_excluding(&entries, key) + key.len() + value.len();
            if needed > limit {
                return Err(AnalyticsError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AnalyticsResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

// ============================================================================
// FILE STORE
// ============================================================================

pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Create the store, creating `base_dir` if needed
    pub fn new(base_dir: PathBuf) -> AnalyticsResult<Self> {
        fs::create_dir_all(&base_dir)?;
        log::debug!("File store opened at {:?}", base_dir);
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path backing `key`. Path separators in keys are flattened.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
            .collect();
        self.base_dir.join(format!("{}.json", safe))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> AnalyticsResult<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn set(&self, key: &str, value: &str) -> AnalyticsResult<()> {
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> AnalyticsResult<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
