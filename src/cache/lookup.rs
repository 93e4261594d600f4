use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::{CacheError, CachedResponse, ResponseCache};
use crate::core::types::Assembly;
use crate::error::Error;
use crate::resolve::source::{
    AnnotationSource, PanelSource, ReferenceRegion, TranscriptCandidate, VariantLocation,
    VariantSource,
};
use crate::utils::validation::lookup_key;

/// Wraps a collaborator with lookup-or-fetch caching.
///
/// Concurrent requests for the same key are serialized on a per-key lock, so
/// at most one external call is made per key and the stored value is the one
/// every caller sees. Failed lookups are not cached.
///
/// Keys carry the assembly the wrapped collaborator answers for, so one
/// store can be shared by GRCh37 and GRCh38 runs.
pub struct CachedSource<S> {
    inner: S,
    cache: Arc<dyn ResponseCache>,
    assembly: Assembly,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S> CachedSource<S> {
    pub fn new(inner: S, cache: Arc<dyn ResponseCache>, assembly: Assembly) -> Self {
        Self {
            inner,
            cache,
            assembly,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn key_lock(&self, key: &str) -> Result<Arc<Mutex<()>>, CacheError> {
        let mut locks = self.in_flight.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(Arc::clone(locks.entry(key.to_string()).or_default()))
    }

    /// Drop the per-key lock once no other caller is waiting on it
    fn release_key_lock(&self, key: &str, lock: Arc<Mutex<()>>) -> Result<(), CacheError> {
        let mut locks = self.in_flight.lock().map_err(|_| CacheError::Poisoned)?;
        // One reference in the map, one held here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
        Ok(())
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight.lock().map_or(0, |locks| locks.len())
    }

    fn cached<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        match self.cache.get(key)? {
            Some(hit) => Ok(Some(serde_json::from_value(hit.response)?)),
            None => Ok(None),
        }
    }

    fn lookup_or_fetch<T, F>(&self, operation: &str, input: &str, fetch: F) -> Result<T, Error>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, Error>,
    {
        let key = lookup_key(operation, &self.assembly.to_string(), input);
        if let Some(value) = self.cached(&key)? {
            debug!("Cache hit for {operation}({})", input.trim());
            return Ok(value);
        }

        let lock = self.key_lock(&key)?;
        let result = self.fetch_locked(&lock, &key, operation, input, fetch);
        self.release_key_lock(&key, lock)?;
        result
    }

    fn fetch_locked<T, F>(
        &self,
        lock: &Mutex<()>,
        key: &str,
        operation: &str,
        input: &str,
        fetch: F,
    ) -> Result<T, Error>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, Error>,
    {
        let _guard = lock.lock().map_err(|_| CacheError::Poisoned)?;

        // Another caller may have fetched while we waited for the lock
        if let Some(value) = self.cached(key)? {
            debug!("Cache hit for {operation}({}) after wait", input.trim());
            return Ok(value);
        }

        debug!("Cache miss for {operation}({}), fetching", input.trim());
        let value = fetch()?;
        let stored = self.cache.insert(CachedResponse::new(
            key.to_string(),
            operation,
            input,
            serde_json::to_value(&value)?,
        ))?;
        Ok(serde_json::from_value(stored.response)?)
    }
}

impl<S: AnnotationSource> AnnotationSource for CachedSource<S> {
    fn resolve_transcript(&self, identifier: &str) -> Result<Vec<TranscriptCandidate>, Error> {
        self.lookup_or_fetch("resolve_transcript", identifier, || {
            self.inner.resolve_transcript(identifier)
        })
    }

    fn resolve_gene(&self, gene: &str) -> Result<Vec<String>, Error> {
        self.lookup_or_fetch("resolve_gene", gene, || self.inner.resolve_gene(gene))
    }
}

impl<S: VariantSource> VariantSource for CachedSource<S> {
    fn resolve_variant(&self, rsid: &str) -> Result<Vec<VariantLocation>, Error> {
        self.lookup_or_fetch("resolve_variant", rsid, || self.inner.resolve_variant(rsid))
    }
}

impl<S: PanelSource> PanelSource for CachedSource<S> {
    fn get_panel(&self, panel_id: &str) -> Result<Vec<ReferenceRegion>, Error> {
        self.lookup_or_fetch("get_panel", panel_id, || self.inner.get_panel(panel_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::resolve::memory::InMemorySource;
    use rayon::prelude::*;

    fn source() -> InMemorySource {
        let mut source = InMemorySource::new();
        source.add_gene("BRCA1", vec!["NM_007294".to_string()]);
        source
    }

    #[test]
    fn test_second_lookup_is_served_from_cache() {
        let cache: Arc<dyn ResponseCache> = Arc::new(MemoryCache::new());
        let cached = CachedSource::new(source(), Arc::clone(&cache), Assembly::Grch38);

        assert_eq!(cached.resolve_gene("BRCA1").unwrap(), vec!["NM_007294"]);
        assert_eq!(cached.resolve_gene(" BRCA1 ").unwrap(), vec!["NM_007294"]);
        assert_eq!(cached.inner().calls(), 1);
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_concurrent_lookups_fetch_once() {
        let cache: Arc<dyn ResponseCache> = Arc::new(MemoryCache::new());
        let cached = CachedSource::new(source(), cache, Assembly::Grch38);

        let results: Vec<Vec<String>> = (0..32)
            .into_par_iter()
            .map(|_| cached.resolve_gene("BRCA1").unwrap())
            .collect();
        assert!(results.iter().all(|r| r == &results[0]));
        assert_eq!(cached.inner().calls(), 1);
        assert_eq!(cached.in_flight_len(), 0);
    }

    #[test]
    fn test_key_locks_are_released() {
        let cache: Arc<dyn ResponseCache> = Arc::new(MemoryCache::new());
        let cached = CachedSource::new(source(), cache, Assembly::Grch38);
        for gene in ["BRCA1", "BRCA2", "TP53"] {
            let _ = cached.resolve_gene(gene);
        }
        let _ = cached.get_panel("245");
        assert_eq!(cached.in_flight_len(), 0);
    }

    #[test]
    fn test_assemblies_do_not_share_answers() {
        let cache: Arc<dyn ResponseCache> = Arc::new(MemoryCache::new());
        let panel = |start: u64| {
            let mut source = InMemorySource::new();
            source.add_panel(
                "R208",
                vec![ReferenceRegion {
                    identifier: "BRCA1".to_string(),
                    chromosome: "17".to_string(),
                    start,
                    stop: start + 80_000,
                }],
            );
            source
        };

        let grch38 = CachedSource::new(panel(43_044_295), Arc::clone(&cache), Assembly::Grch38);
        assert_eq!(grch38.get_panel("R208").unwrap()[0].start, 43_044_295);

        let grch37 = CachedSource::new(panel(41_196_312), Arc::clone(&cache), Assembly::Grch37);
        assert_eq!(grch37.get_panel("R208").unwrap()[0].start, 41_196_312);
        assert_eq!(grch37.inner().calls(), 1);
        assert_eq!(cache.len().unwrap(), 2);

        // Same assembly again is a hit
        let again = CachedSource::new(panel(0), cache, Assembly::Grch38);
        assert_eq!(again.get_panel("R208").unwrap()[0].start, 43_044_295);
        assert_eq!(again.inner().calls(), 0);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let cache: Arc<dyn ResponseCache> = Arc::new(MemoryCache::new());
        let cached = CachedSource::new(InMemorySource::new(), Arc::clone(&cache), Assembly::Grch38);

        assert!(cached.get_panel("245").is_err());
        assert!(cached.get_panel("245").is_err());
        assert_eq!(cached.inner().calls(), 2);
        assert_eq!(cache.len().unwrap(), 0);
    }

    #[test]
    fn test_operations_do_not_share_keys() {
        let cache: Arc<dyn ResponseCache> = Arc::new(MemoryCache::new());
        let cached = CachedSource::new(source(), Arc::clone(&cache), Assembly::Grch38);
        cached.resolve_gene("BRCA1").unwrap();
        assert!(cached.resolve_transcript("BRCA1").unwrap().is_empty());
        assert_eq!(cached.inner().calls(), 2);
        assert_eq!(cache.len().unwrap(), 2);
    }
}
