//! Time-bounded cache of raw engine results.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::transport::{SearchEngine, SearchHit};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub engine: SearchEngine,
    pub query: String,
    pub num_results: usize,
}

struct CacheEntry {
    hits: Vec<SearchHit>,
    inserted_at: Instant,
}

/// Entries are valid while `now - inserted_at < ttl`. All access goes through
/// a single lock.
pub struct SearchCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl SearchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        // Entries are written whole, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &CacheKey) -> Option<Vec<SearchHit>> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&self, key: CacheKey, hits: Vec<SearchHit>) {
        self.insert_at(key, hits, Instant::now());
    }

    pub(crate) fn get_at(&self, key: &CacheKey, now: Instant) -> Option<Vec<SearchHit>> {
        let mut entries = self.lock();
        let expired = match entries.get(key) {
            Some(entry) if now.saturating_duration_since(entry.inserted_at) < self.ttl => {
                return Some(entry.hits.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    pub(crate) fn insert_at(&self, key: CacheKey, hits: Vec<SearchHit>, now: Instant) {
        let mut entries = self.lock();
        entries.insert(
            key,
            CacheEntry {
                hits,
                inserted_at: now,
            },
        );
        let ttl = self.ttl;
        entries.retain(|_, entry| now.saturating_duration_since(entry.inserted_at) < ttl);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(query: &str) -> CacheKey {
        CacheKey {
            engine: SearchEngine::DuckDuckGo,
            query: query.to_string(),
            num_results: 5,
        }
    }

    fn hits() -> Vec<SearchHit> {
        vec![SearchHit::new("t", "https://t.example", "s", SearchEngine::DuckDuckGo)]
    }

    #[test]
    fn entry_expires_exactly_at_ttl() {
        let cache = SearchCache::new(Duration::from_secs(60));
        let start = Instant::now();
        cache.insert_at(key("cells"), hits(), start);

        assert!(cache
            .get_at(&key("cells"), start + Duration::from_secs(59))
            .is_some());
        assert!(cache
            .get_at(&key("cells"), start + Duration::from_secs(60))
            .is_none());
        assert!(cache.is_empty(), "expired entry is evicted on read");
    }

    #[test]
    fn insert_evicts_expired_entries() {
        let cache = SearchCache::new(Duration::from_secs(10));
        let start = Instant::now();
        cache.insert_at(key("old"), hits(), start);
        cache.insert_at(key("new"), hits(), start + Duration::from_secs(11));

        assert_eq!(cache.len(), 1);
        assert!(cache
            .get_at(&key("new"), start + Duration::from_secs(12))
            .is_some());
    }

    #[test]
    fn keys_distinguish_result_counts_and_clear_empties() {
        let cache = SearchCache::new(Duration::from_secs(10));
        cache.insert(key("cells"), hits());

        let other = CacheKey {
            num_results: 3,
            ..key("cells")
        };
        assert!(cache.get(&other).is_none());
        assert!(cache.get(&key("cells")).is_some());

        cache.clear();
        assert!(cache.is_empty());
    }
}
