//! Per-worker multiplier cache with a fixed time-to-live
//!
//! Each pipeline worker owns one `MultiplierCache` together with its own store
//! connection. Nothing here is shared or locked.
//!
//! Entries are validated lazily on read: an entry older than [`CACHE_TTL`] is
//! treated as absent and replaced by a fresh store lookup. Store updates that
//! land while an entry is still valid are not observed until it expires.

use crate::store::MultiplierStore;
use std::collections::HashMap;
use std::ops::AddAssign;
use std::time::{Duration, Instant};

/// How long a fetched multiplier (or its absence) is served without re-querying
pub const CACHE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    multiplier: Option<f64>,
    fetched_at: Instant,
}

impl CacheEntry {
    fn is_valid(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) < CACHE_TTL
    }
}

/// Lookup counters for one cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub store_errors: u64,
}

impl AddAssign for CacheStats {
    fn add_assign(&mut self, other: Self) {
        self.hits += other.hits;
        self.misses += other.misses;
        self.store_errors += other.store_errors;
    }
}

pub struct MultiplierCache<S> {
    store: S,
    entries: HashMap<String, CacheEntry>,
    stats: CacheStats,
}

impl<S: MultiplierStore> MultiplierCache<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            entries: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// Multiplier for `key` as of `now`
    ///
    /// Returns `None` when the store has no row for the key or the lookup
    /// failed. The caller decides the default. A failed lookup is not
    /// cached, so the next call retries the store.
    pub fn get(&mut self, key: &str, now: Instant) -> Option<f64> {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_valid(now) {
                self.stats.hits += 1;
                return entry.multiplier;
            }
        }

        self.stats.misses += 1;

        match self.store.lookup(key) {
            Ok(multiplier) => {
                self.entries.insert(
                    key.to_string(),
                    CacheEntry {
                        multiplier,
                        fetched_at: now,
                    },
                );
                multiplier
            }
            Err(e) => {
                self.stats.store_errors += 1;
                log::warn!("⚠️  Multiplier lookup failed for {}: {}", key, e);
                None
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
