use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

use super::{CacheError, CachedResponse, ResponseCache};

/// Store version for compatibility checking
pub const STORE_VERSION: &str = "1.0.0";

/// Serializable store format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreData {
    pub version: String,
    pub created_at: String,
    pub entries: BTreeMap<String, CachedResponse>,
}

/// JSON document store persisted to a single file.
///
/// Every insert rewrites the file atomically (temporary file + rename) after
/// merging in whatever another process stored meanwhile, so documents are
/// only ever added.
#[derive(Debug)]
pub struct DocumentStore {
    path: PathBuf,
    created_at: String,
    entries: RwLock<BTreeMap<String, CachedResponse>>,
}

impl DocumentStore {
    /// Open the store at `path`, starting empty if the file does not exist
    ///
    /// # Errors
    ///
    /// Returns a `CacheError` if an existing file cannot be read or parsed.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        let (created_at, entries) = match Self::read(path)? {
            Some(data) => (data.created_at, data.entries),
            None => (chrono::Utc::now().to_rfc3339(), BTreeMap::new()),
        };
        debug!("Opened cache {} with {} document(s)", path.display(), entries.len());
        Ok(Self {
            path: path.to_path_buf(),
            created_at,
            entries: RwLock::new(entries),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> Result<Option<StoreData>, CacheError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let data: StoreData = serde_json::from_str(&content)?;

        // Version check (warn but don't fail)
        if data.version != STORE_VERSION {
            warn!(
                "Cache version mismatch (expected {STORE_VERSION}, found {}), ignoring {}",
                data.version,
                path.display()
            );
            return Ok(None);
        }
        Ok(Some(data))
    }

    fn persist(&self, entries: &BTreeMap<String, CachedResponse>) -> Result<(), CacheError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let data = StoreData {
            version: STORE_VERSION.to_string(),
            created_at: self.created_at.clone(),
            entries: entries.clone(),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, &data)?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.path).map_err(|e| CacheError::Io(e.error))?;
        Ok(())
    }
}

impl ResponseCache for DocumentStore {
    fn get(&self, key: &str) -> Result<Option<CachedResponse>, CacheError> {
        let entries = self.entries.read().map_err(|_| CacheError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn insert(&self, entry: CachedResponse) -> Result<CachedResponse, CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;

        if let Some(data) = Self::read(&self.path)? {
            for (key, stored) in data.entries {
                entries.entry(key).or_insert(stored);
            }
        }
        if let Some(existing) = entries.get(&entry.key) {
            return Ok(existing.clone());
        }

        let key = entry.key.clone();
        entries.insert(key.clone(), entry.clone());
        if let Err(e) = self.persist(&entries) {
            entries.remove(&key);
            return Err(e);
        }
        Ok(entry)
    }

    fn len(&self) -> Result<usize, CacheError> {
        Ok(self.entries.read().map_err(|_| CacheError::Poisoned)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn entry(key: &str, value: serde_json::Value) -> CachedResponse {
        CachedResponse::new(key.to_string(), "resolve_variant", "rs1", value)
    }

    #[test]
    fn test_persists_across_opens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db").join("cache.json");

        let store = DocumentStore::open(&path).unwrap();
        assert_eq!(store.len().unwrap(), 0);
        store.insert(entry("a", json!([1]))).unwrap();
        assert!(path.exists());

        let reopened = DocumentStore::open(&path).unwrap();
        assert_eq!(reopened.len().unwrap(), 1);
        assert_eq!(reopened.get("a").unwrap().unwrap().response, json!([1]));
    }

    #[test]
    fn test_first_write_wins_across_handles() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        let one = DocumentStore::open(&path).unwrap();
        let two = DocumentStore::open(&path).unwrap();
        one.insert(entry("a", json!("first"))).unwrap();

        // The second handle has not seen "a" yet but must not overwrite it
        let stored = two.insert(entry("a", json!("second"))).unwrap();
        assert_eq!(stored.response, json!("first"));
        two.insert(entry("b", json!("other"))).unwrap();

        let reopened = DocumentStore::open(&path).unwrap();
        assert_eq!(reopened.len().unwrap(), 2);
        assert_eq!(reopened.get("a").unwrap().unwrap().response, json!("first"));
    }

    #[test]
    fn test_version_mismatch_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, r#"{"version": "0.1", "created_at": "x", "entries": {}}"#).unwrap();
        assert_eq!(DocumentStore::open(&path).unwrap().len().unwrap(), 0);
    }

    #[test]
    fn test_corrupt_store_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(DocumentStore::open(&path), Err(CacheError::Parse(_))));
    }
}
