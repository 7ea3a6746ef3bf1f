use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::resolver::ResolvedBlock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

/// Memoizes resolution across `generate` calls, keyed by the raw class
/// string. Negative results are cached too, so an unknown class costs one
/// registry walk per process.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: RwLock<HashMap<String, Option<Arc<ResolvedBlock>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_insert_with<F>(&self, raw: &str, resolve: F) -> Option<Arc<ResolvedBlock>>
    where
        F: FnOnce() -> Option<ResolvedBlock>,
    {
        if let Some(entry) = self.entries.read().get(raw) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return entry.clone();
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let resolved = resolve().map(Arc::new);
        self.entries
            .write()
            .entry(raw.to_string())
            .or_insert(resolved)
            .clone()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.entries.read().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheStats, ResolutionCache};
    use crate::properties::PropertyMap;
    use crate::resolver::ResolvedBlock;
    use std::cell::Cell;

    fn block() -> ResolvedBlock {
        ResolvedBlock {
            wrappers: Vec::new(),
            selectors: vec![".block".to_string()],
            properties: PropertyMap::new().with("display", "block"),
        }
    }

    #[test]
    fn resolves_once_per_class() {
        let cache = ResolutionCache::new();
        let calls = Cell::new(0);
        for _ in 0..3 {
            let entry = cache.get_or_insert_with("block", || {
                calls.set(calls.get() + 1);
                Some(block())
            });
            assert!(entry.is_some());
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 2,
                misses: 1,
                size: 1
            }
        );
    }

    #[test]
    fn caches_misses_and_clears() {
        let cache = ResolutionCache::new();
        assert!(cache.get_or_insert_with("nope", || None).is_none());
        assert!(cache.get_or_insert_with("nope", || Some(block())).is_none());
        assert_eq!(cache.stats().hits, 1);

        cache.clear();
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
