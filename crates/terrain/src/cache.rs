//! Raw response caching.

use std::collections::HashMap;
use std::sync::Mutex;

/// Storage for raw response bytes, keyed by URL.
///
/// Implementations use interior mutability so a client can be shared
/// between concurrent requests.
pub trait Cache {
    fn get(&self, url: &str) -> Option<Vec<u8>>;
    fn insert(&self, url: &str, bytes: &[u8]);
}

/// Keeps every response in memory for the lifetime of the cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached responses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl Cache for MemoryCache {
    fn get(&self, url: &str) -> Option<Vec<u8>> {
        self.entries.lock().ok()?.get(url).cloned()
    }

    fn insert(&self, url: &str, bytes: &[u8]) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(url.to_owned(), bytes.to_vec());
        }
    }
}

/// Caches nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl Cache for NoCache {
    fn get(&self, _url: &str) -> Option<Vec<u8>> {
        None
    }

    fn insert(&self, _url: &str, _bytes: &[u8]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cache_round_trip() {
        let cache = MemoryCache::new();
        assert!(cache.get("a").is_none());

        cache.insert("a", &[1, 2, 3]);
        assert_eq!(cache.get("a"), Some(vec![1, 2, 3]));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_no_cache_forgets() {
        NoCache.insert("a", &[1]);
        assert!(NoCache.get("a").is_none());
    }
}
