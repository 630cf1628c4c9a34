//! In-memory LRU image cache bounded by entry count and decoded byte cost.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::domain::entities::{DecodedImage, ResourceKey};
use crate::domain::ports::ImageCachePort;

/// Default maximum number of images to cache in memory.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default maximum total decoded size in bytes (64 MiB).
pub const DEFAULT_MAX_COST: usize = 64 * 1024 * 1024;

static SHARED: OnceLock<Arc<MemoryImageCache>> = OnceLock::new();

/// Limits for [`MemoryImageCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheLimits {
    /// Maximum number of entries.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Maximum summed decoded size of all entries in bytes.
    #[serde(default = "default_max_cost", rename = "max_cost_bytes")]
    pub max_cost: usize,
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

fn default_max_cost() -> usize {
    DEFAULT_MAX_COST
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_cost: DEFAULT_MAX_COST,
        }
    }
}

struct Entries {
    lru: LruCache<ResourceKey, DecodedImage>,
    cost: usize,
}

/// In-memory LRU cache for decoded images.
/// Thread-safe; all access goes through one short-lived lock.
pub struct MemoryImageCache {
    entries: Mutex<Entries>,
    max_cost: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryImageCache {
    /// Creates a new cache with the given limits.
    /// A zero entry limit is treated as one.
    #[must_use]
    pub fn new(limits: CacheLimits) -> Self {
        let cap = NonZeroUsize::new(limits.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(Entries {
                lru: LruCache::new(cap),
                cost: 0,
            }),
            max_cost: limits.max_cost,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a new cache with the default limits.
    #[must_use]
    pub fn with_default_limits() -> Self {
        Self::new(CacheLimits::default())
    }

    /// Returns the process-wide cache used by loaders that are not given one.
    /// Created with default limits on first use and never dropped.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        SHARED
            .get_or_init(|| Arc::new(Self::with_default_limits()))
            .clone()
    }

    /// Peeks at an image without promoting it in the LRU or touching stats.
    #[must_use]
    pub fn peek(&self, key: &ResourceKey) -> Option<DecodedImage> {
        self.entries.lock().lru.peek(key).cloned()
    }

    /// Total decoded size of all cached images in bytes.
    #[must_use]
    pub fn cost(&self) -> usize {
        self.entries.lock().cost
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let entries = self.entries.lock();
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: entries.lru.len(),
            cost: entries.cost,
        }
    }
}

impl Default for MemoryImageCache {
    fn default() -> Self {
        Self::with_default_limits()
    }
}

impl std::fmt::Debug for MemoryImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("MemoryImageCache")
            .field("len", &entries.lru.len())
            .field("cap", &entries.lru.cap())
            .field("cost", &entries.cost)
            .field("max_cost", &self.max_cost)
            .finish_non_exhaustive()
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached images.
    pub size: usize,
    /// Current decoded size of cached images in bytes.
    pub cost: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} images ({} bytes), {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.cost, self.hit_rate, self.hits, self.misses
        )
    }
}

impl ImageCachePort for MemoryImageCache {
    fn get(&self, key: &ResourceKey) -> Option<DecodedImage> {
        let mut entries = self.entries.lock();
        if let Some(img) = entries.lru.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache hit");
            Some(img.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache miss");
            None
        }
    }

    fn set(&self, key: ResourceKey, image: DecodedImage) {
        let mut entries = self.entries.lock();
        debug!(key = %key, cost = image.cost(), "Storing image in memory cache");

        entries.cost += image.cost();
        // `push` hands back either the replaced value for `key` or the entry
        // evicted by the count limit.
        if let Some((old_key, old)) = entries.lru.push(key, image) {
            entries.cost -= old.cost();
            trace!(key = %old_key, "Dropped image from memory cache");
        }

        // The entry just pushed is most recent, so it goes last.
        while entries.cost > self.max_cost && entries.lru.len() > 1 {
            match entries.lru.pop_lru() {
                Some((evicted_key, evicted)) => {
                    entries.cost -= evicted.cost();
                    debug!(key = %evicted_key, "Evicted image from memory cache");
                }
                None => break,
            }
        }
    }

    fn remove(&self, key: &ResourceKey) -> Option<DecodedImage> {
        let mut entries = self.entries.lock();
        let removed = entries.lru.pop(key);
        if let Some(img) = &removed {
            entries.cost -= img.cost();
            debug!(key = %key, "Removed image from memory cache");
        }
        removed
    }

    fn len(&self) -> usize {
        self.entries.lock().lru.len()
    }

    fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.lru.clear();
        entries.cost = 0;
        debug!("Cleared memory image cache");
    }
}
