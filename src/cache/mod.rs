//! Cache of external-service responses and the audit trail.
//!
//! Resolvers never see a global cache: a [`ResponseCache`] implementation is
//! handed to [`CachedSource`], which wraps the real collaborators. Tests use
//! [`MemoryCache`], the CLI uses the file-backed [`DocumentStore`].
//!
//! Documents are keyed by `<operation>:<md5(input)>` and are never
//! overwritten: the first response stored for a key wins.
//!
//! [`CachedSource`]: lookup::CachedSource
//! [`DocumentStore`]: store::DocumentStore

pub mod audit;
pub mod lookup;
pub mod store;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to read or write store: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse store: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Corrupt audit log at line {line}: {reason}")]
    CorruptLog { line: usize, reason: String },

    #[error("Cache lock poisoned")]
    Poisoned,
}

/// One stored response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub key: String,
    pub operation: String,
    pub input: String,
    pub response: serde_json::Value,
    /// RFC 3339 fetch timestamp
    pub fetched_at: String,
}

impl CachedResponse {
    #[must_use]
    pub fn new(key: String, operation: &str, input: &str, response: serde_json::Value) -> Self {
        Self {
            key,
            operation: operation.to_string(),
            input: input.trim().to_string(),
            response,
            fetched_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Repository of cached lookups
pub trait ResponseCache: Send + Sync {
    /// Fetch the document stored under `key`
    ///
    /// # Errors
    ///
    /// Returns a `CacheError` when the store cannot be read.
    fn get(&self, key: &str) -> Result<Option<CachedResponse>, CacheError>;

    /// Store a document unless one already exists for its key.
    ///
    /// Returns the document now held for the key, which is the earlier one if
    /// the key was already taken.
    ///
    /// # Errors
    ///
    /// Returns a `CacheError` when the store cannot be written.
    fn insert(&self, entry: CachedResponse) -> Result<CachedResponse, CacheError>;

    /// Number of stored documents
    ///
    /// # Errors
    ///
    /// Returns a `CacheError` when the store cannot be read.
    fn len(&self) -> Result<usize, CacheError>;
}

/// Process-local cache
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CachedResponse>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<CachedResponse>, CacheError> {
        let entries = self.entries.read().map_err(|_| CacheError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn insert(&self, entry: CachedResponse) -> Result<CachedResponse, CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        Ok(entries.entry(entry.key.clone()).or_insert(entry).clone())
    }

    fn len(&self) -> Result<usize, CacheError> {
        Ok(self.entries.read().map_err(|_| CacheError::Poisoned)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_write_wins() {
        let cache = MemoryCache::new();
        let first = CachedResponse::new("k".to_string(), "resolve_gene", "BRCA1", json!(["NM_007294"]));
        let second = CachedResponse::new("k".to_string(), "resolve_gene", "BRCA1", json!(["NM_007300"]));

        assert_eq!(cache.insert(first.clone()).unwrap(), first);
        assert_eq!(cache.insert(second).unwrap(), first);
        assert_eq!(cache.get("k").unwrap(), Some(first));
        assert_eq!(cache.len().unwrap(), 1);
        assert!(cache.get("other").unwrap().is_none());
    }
}
