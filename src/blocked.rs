//! The blocked range store and matcher.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{RequestCache, SharedCache, TransientCache, DEFAULT_REQUEST_CACHE_CAPACITY};
use crate::error::Error;
use crate::index::{index_key, RangeIndex};
use crate::metadata::RefreshMetadata;
use crate::range::ip_in_ranges;
use crate::source::RangeSource;
use crate::store::OptionStore;
use crate::Result;

/// Option key the blocked range collection is persisted under.
pub const OPTION_KEY: &str = "TrackingSpamBlockedIpRanges";

/// Prefix of membership answers in a transient cache.
const MEMO_KEY_PREFIX: &str = "TrackingSpamPreventionIsIpInRange";

/// Store of untrusted IP ranges with indexed membership tests.
///
/// This is the only writer of the persisted collection. Reads on the
/// request path go through the shared cache and accept its staleness;
/// writes ([`ban_ip`](Self::ban_ip), refreshes, clears) always start from
/// the option store and replace the whole collection in one write.
///
/// # Example
///
/// ```
/// use cloudblock::{BlockedIpRanges, MemoryOptionStore, SharedRangeCache};
/// use std::sync::Arc;
///
/// let store = Arc::new(MemoryOptionStore::new());
/// let shared = Arc::new(SharedRangeCache::new());
/// let ranges = BlockedIpRanges::new(store.clone(), shared.clone());
///
/// ranges.ban_ip("203.0.113.5").unwrap();
/// shared.reload(store.as_ref()).unwrap();
///
/// assert!(ranges.is_excluded("203.0.113.5"));
/// assert!(!ranges.is_excluded("203.0.113.6"));
/// ```
pub struct BlockedIpRanges {
    store: Arc<dyn OptionStore>,
    shared: Arc<dyn SharedCache>,
    /// Feeds queried by a refresh, in order
    sources: Vec<Box<dyn RangeSource>>,
    /// Administrative switch for outbound network access
    internet_enabled: bool,
    request_cache_capacity: usize,
}

impl BlockedIpRanges {
    /// Create a store without any range feeds.
    pub fn new(store: Arc<dyn OptionStore>, shared: Arc<dyn SharedCache>) -> Self {
        Self {
            store,
            shared,
            sources: Vec::new(),
            internet_enabled: true,
            request_cache_capacity: DEFAULT_REQUEST_CACHE_CAPACITY,
        }
    }

    /// Replace the range feeds used by refreshes.
    pub fn with_sources(mut self, sources: Vec<Box<dyn RangeSource>>) -> Self {
        self.sources = sources;
        self
    }

    /// Set whether outbound network access is allowed.
    pub fn with_internet_enabled(mut self, enabled: bool) -> Self {
        self.internet_enabled = enabled;
        self
    }

    /// Set how many answers per-request memo caches are pre-sized for.
    pub fn with_request_cache_capacity(mut self, capacity: usize) -> Self {
        self.request_cache_capacity = capacity;
        self
    }

    /// Append a range feed; it is queried after the existing ones.
    pub fn add_source(&mut self, source: Box<dyn RangeSource>) {
        self.sources.push(source);
    }

    /// Names of the configured feeds, in query order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Read the authoritative collection from the option store.
    pub fn blocked_ranges(&self) -> Result<RangeIndex> {
        match self.store.get(OPTION_KEY)? {
            Some(data) => RangeIndex::from_bytes(&data).map_err(|e| Error::CorruptCollection {
                key: OPTION_KEY.to_string(),
                reason: e.to_string(),
            }),
            None => Ok(RangeIndex::new()),
        }
    }

    /// Replace the persisted collection.
    pub fn set_blocked_ranges(&self, ranges: &RangeIndex) -> Result<()> {
        self.persist(ranges).map(|_| ())
    }

    fn persist(&self, ranges: &RangeIndex) -> Result<Vec<u8>> {
        let data = ranges.to_bytes()?;
        self.store.set(OPTION_KEY, &data)?;
        Ok(data)
    }

    /// Start a unit of work with its own memo cache.
    pub fn request(&self) -> RequestScope<'_> {
        RequestScope {
            ranges: self,
            cache: RequestCache::with_capacity(self.request_cache_capacity),
        }
    }

    /// Check whether an address is inside any blocked range.
    ///
    /// Runs as its own unit of work; use [`request`](Self::request) to share
    /// memoized answers across several checks.
    pub fn is_excluded(&self, ip: &str) -> bool {
        self.request().is_excluded(ip)
    }

    /// Check whether an address is inside any blocked range, memoizing the
    /// answer in `cache`.
    ///
    /// Never fails: empty or malformed input, an unpopulated shared cache and
    /// a missing bucket all answer `false`.
    pub fn is_excluded_with(&self, ip: &str, cache: &dyn TransientCache) -> bool {
        if ip.is_empty() {
            return false;
        }

        let addr: IpAddr = match ip.parse() {
            Ok(addr) => addr,
            Err(_) => return false,
        };

        let key = match index_key(ip) {
            Some(key) => key,
            None => return false,
        };

        let snapshot = match self.shared.get() {
            Some(snapshot) => snapshot,
            None => return false,
        };
        let bucket = match snapshot.bucket(key) {
            Some(bucket) if !bucket.is_empty() => bucket,
            _ => return false,
        };

        let memo_key = format!("{}{}", MEMO_KEY_PREFIX, addr);
        if let Some(cached) = cache.get(&memo_key) {
            return cached;
        }

        let excluded = ip_in_ranges(addr, bucket);
        cache.set(&memo_key, excluded);
        excluded
    }

    /// Add a single address (or range) to the persisted collection.
    ///
    /// The input is not validated. Banning the same address twice stores it
    /// twice. The shared cache is left alone; readers see the ban once it is
    /// repopulated. Input without an index key (the empty string) changes
    /// nothing.
    pub fn ban_ip(&self, ip: &str) -> Result<RangeIndex> {
        let mut ranges = self.blocked_ranges()?;

        if !ranges.insert(ip) {
            log::warn!("Ignoring ban of unindexable input {:?}", ip);
            return Ok(ranges);
        }

        self.persist(&ranges)?;
        log::info!("Banned {} ({} blocked entries)", ip, ranges.len());
        Ok(ranges)
    }

    /// Remove every blocked range.
    pub fn unset_all_ip_ranges(&self) -> Result<()> {
        self.persist(&RangeIndex::new())?;
        log::info!("Cleared all blocked IP ranges");
        Ok(())
    }

    /// Rebuild the collection from every range feed.
    ///
    /// With network access disabled the collection is cleared instead.
    /// A failing feed contributes nothing and does not stop the others.
    /// The previous collection, manual bans included, is replaced.
    pub fn update_blocked_ip_ranges(&self) -> Result<()> {
        if !self.internet_enabled {
            log::info!("Internet access disabled, not blocking any cloud ranges");
            let data = self.persist(&RangeIndex::new())?;
            return RefreshMetadata::now(0, &data).save(self.store.as_ref());
        }

        let mut ranges = Vec::new();
        for source in &self.sources {
            match source.get_ranges() {
                Ok(source_ranges) => {
                    log::debug!("{}: {} ranges", source.name(), source_ranges.len());
                    ranges.extend(source_ranges);
                }
                Err(e) => log::warn!("Failed to fetch ranges from {}: {}", source.name(), e),
            }
        }

        let index = RangeIndex::from_ranges(ranges);
        let data = self.persist(&index)?;

        let meta = RefreshMetadata::now(index.len(), &data);
        meta.save(self.store.as_ref())?;

        log::info!(
            "Updated blocked IP ranges: {} entries in {} buckets (sha256 {})",
            index.len(),
            index.bucket_count(),
            meta.fingerprint.as_deref().unwrap_or("-")
        );
        Ok(())
    }

    /// Run a refresh only if the last one is older than `interval`.
    ///
    /// Returns `true` if a refresh ran.
    pub fn update_if_needed(&self, interval: Duration) -> Result<bool> {
        if self.last_refresh()?.needs_update(interval) {
            self.update_blocked_ip_ranges()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Metadata recorded by the most recent refresh.
    pub fn last_refresh(&self) -> Result<RefreshMetadata> {
        RefreshMetadata::load(self.store.as_ref())
    }
}

/// One unit of work against a [`BlockedIpRanges`].
///
/// Answers are memoized for the lifetime of the scope, so repeated checks of
/// the same address agree even if the shared cache is replaced in between.
pub struct RequestScope<'a> {
    ranges: &'a BlockedIpRanges,
    cache: RequestCache,
}

impl RequestScope<'_> {
    /// Check whether an address is inside any blocked range.
    pub fn is_excluded(&self, ip: &str) -> bool {
        self.ranges.is_excluded_with(ip, &self.cache)
    }

    /// The memo cache backing this scope.
    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }
}
