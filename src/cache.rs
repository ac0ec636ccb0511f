//! Read-through caches in front of the persisted collection.
//!
//! Two scopes are involved:
//! - [`SharedCache`]: the decoded collection, shared by every lookup in the
//!   process and repopulated independently of the range store (for example
//!   by a background job). It may lag behind the option store.
//! - [`TransientCache`]: memoized membership answers for a single unit of
//!   work, such as one incoming request.
//!
//! Both only affect latency. Dropping either never changes an answer
//! relative to the option store.

use ahash::AHashMap;
use arc_swap::ArcSwapOption;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::blocked::OPTION_KEY;
use crate::error::Error;
use crate::index::RangeIndex;
use crate::store::OptionStore;
use crate::Result;

/// Default number of answers a per-request memo cache is sized for.
pub const DEFAULT_REQUEST_CACHE_CAPACITY: usize = 1024;

/// Process-shared view of the decoded range collection.
pub trait SharedCache: Send + Sync {
    /// Current snapshot, or `None` when the cache has not been populated.
    fn get(&self) -> Option<Arc<RangeIndex>>;
}

/// Memoized membership answers scoped to one unit of work.
pub trait TransientCache {
    /// Cached answer for `key`.
    fn get(&self, key: &str) -> Option<bool>;

    /// Remember the answer for `key`.
    fn set(&self, key: &str, value: bool);
}

/// Shared collection snapshot with atomic hot reload.
///
/// Readers take a cheap `Arc` of the current snapshot; in-flight lookups
/// finish against the snapshot they started with while new lookups see the
/// replacement.
#[derive(Debug, Default)]
pub struct SharedRangeCache {
    snapshot: ArcSwapOption<RangeIndex>,
    /// Bumped on every replacement or invalidation.
    generation: AtomicU64,
}

impl SharedRangeCache {
    /// Create an unpopulated cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache holding the given collection.
    pub fn from_index(index: RangeIndex) -> Self {
        let cache = Self::new();
        cache.store(index);
        cache
    }

    /// Replace the snapshot.
    pub fn store(&self, index: RangeIndex) {
        self.snapshot.store(Some(Arc::new(index)));
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Repopulate the snapshot from the option store.
    ///
    /// Returns the number of entries loaded. On error the previous snapshot
    /// is kept.
    pub fn reload(&self, store: &dyn OptionStore) -> Result<usize> {
        let index = match store.get(OPTION_KEY)? {
            Some(data) => RangeIndex::from_bytes(&data).map_err(|e| Error::CorruptCollection {
                key: OPTION_KEY.to_string(),
                reason: e.to_string(),
            })?,
            None => RangeIndex::new(),
        };

        let count = index.len();
        self.store(index);
        log::debug!("Reloaded shared range cache: {} entries", count);
        Ok(count)
    }

    /// Drop the snapshot.
    pub fn invalidate(&self) {
        self.snapshot.store(None);
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Check if a snapshot is present.
    pub fn is_populated(&self) -> bool {
        self.snapshot.load().is_some()
    }

    /// Number of replacements and invalidations so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl SharedCache for SharedRangeCache {
    fn get(&self) -> Option<Arc<RangeIndex>> {
        self.snapshot.load_full()
    }
}

/// Memo cache for one unit of work.
///
/// Never evicts: every answer stays until the cache is cleared or dropped,
/// so repeated checks within a request always agree. Create one per request
/// and drop it when the request ends.
#[derive(Debug)]
pub struct RequestCache {
    answers: RwLock<AHashMap<String, bool>>,
}

impl RequestCache {
    /// Create a cache sized for the default number of answers.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REQUEST_CACHE_CAPACITY)
    }

    /// Create a cache pre-sized for `capacity` answers. It grows past that.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            answers: RwLock::new(AHashMap::with_capacity(capacity)),
        }
    }

    /// Number of memoized answers.
    pub fn len(&self) -> usize {
        self.answers.read().len()
    }

    /// Check if nothing is memoized.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget all answers.
    pub fn clear(&self) {
        self.answers.write().clear();
    }
}

impl Default for RequestCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TransientCache for RequestCache {
    fn get(&self, key: &str) -> Option<bool> {
        self.answers.read().get(key).copied()
    }

    fn set(&self, key: &str, value: bool) {
        self.answers.write().insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryOptionStore;

    #[test]
    fn test_unpopulated_shared_cache() {
        let cache = SharedRangeCache::new();
        assert!(!cache.is_populated());
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_store_and_invalidate() {
        let cache = SharedRangeCache::from_index(RangeIndex::from_ranges(["10.0.0.0/8"]));
        assert!(cache.is_populated());
        assert_eq!(cache.get().unwrap().len(), 1);
        assert_eq!(cache.generation(), 1);

        cache.invalidate();
        assert!(cache.get().is_none());
        assert_eq!(cache.generation(), 2);
    }

    #[test]
    fn test_snapshot_outlives_replacement() {
        let cache = SharedRangeCache::from_index(RangeIndex::from_ranges(["10.0.0.0/8"]));
        let old = cache.get().unwrap();

        cache.store(RangeIndex::new());
        assert_eq!(old.len(), 1);
        assert!(cache.get().unwrap().is_empty());
    }

    #[test]
    fn test_reload_from_store() {
        let store = MemoryOptionStore::new();
        let cache = SharedRangeCache::new();

        // Missing option loads as empty
        assert_eq!(cache.reload(&store).unwrap(), 0);
        assert!(cache.is_populated());

        let index = RangeIndex::from_ranges(["10.0.0.0/8", "f::/16"]);
        store.set(OPTION_KEY, &index.to_bytes().unwrap()).unwrap();
        assert_eq!(cache.reload(&store).unwrap(), 2);
        assert_eq!(*cache.get().unwrap(), index);
    }

    #[test]
    fn test_reload_keeps_snapshot_on_corrupt_data() {
        let store = MemoryOptionStore::new();
        store.set(OPTION_KEY, b"{broken").unwrap();

        let cache = SharedRangeCache::from_index(RangeIndex::from_ranges(["10.0.0.0/8"]));
        assert!(matches!(
            cache.reload(&store),
            Err(Error::CorruptCollection { .. })
        ));
        assert_eq!(cache.get().unwrap().len(), 1);
    }

    #[test]
    fn test_request_cache() {
        let cache = RequestCache::with_capacity(16);
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);

        cache.set("a", true);
        cache.set("b", false);
        assert_eq!(cache.get("a"), Some(true));
        assert_eq!(cache.get("b"), Some(false));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn test_request_cache_keeps_every_answer() {
        let cache = RequestCache::with_capacity(4);
        for i in 0..5000 {
            cache.set(&format!("10.0.{}.{}", i / 256, i % 256), i % 3 == 0);
        }

        assert_eq!(cache.len(), 5000);
        for i in 0..5000 {
            assert_eq!(
                cache.get(&format!("10.0.{}.{}", i / 256, i % 256)),
                Some(i % 3 == 0)
            );
        }
    }
}
