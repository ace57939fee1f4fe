// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Concurrent LRU cache of parsed type strings.
//!
//! Parsing a type string builds a fresh descriptor tree each time. The cache maps the
//! text to the resulting [`DType`] so repeated lookups return a clone of the same
//! handle (one atomic increment). Hits are served under a shared read lock and then
//! promoted to most recently used; misses parse outside the cache and insert under
//! the write lock. A secondary `DashSet`
//! tracks pinned strings that are never evicted.

use crate::config::runtime;
use crate::error::Result;
use crate::types::parse::parse_dtype;
use crate::types::DType;
use dashmap::DashSet;
use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// Cache hit/miss statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct LookupStats {
    pub hits: u64,
    pub misses: u64,
    pub last_miss_ns: u64,
}

/// LRU-based concurrent cache of parsed types.
pub struct TypeCache {
    inner: RwLock<LruCache<Arc<str>, DType>>,
    pinned: DashSet<Arc<str>>,
    stats: RwLock<LookupStats>,
}

impl TypeCache {
    /// A capacity of 0 is raised to 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: RwLock::new(LruCache::new(capacity)),
            pinned: DashSet::new(),
            stats: RwLock::new(LookupStats::default()),
        }
    }

    /// Returns the cached type for `text`, parsing and inserting it on a miss.
    ///
    /// Parse failures are not cached.
    pub fn get_or_parse(&self, text: &str) -> Result<DType> {
        let key = text.trim();

        let hit = self.inner.read().peek(key).cloned();
        if let Some(hit) = hit {
            // Refresh recency; a contended write lock skips it rather than wait.
            if let Some(mut cache) = self.inner.try_write() {
                cache.promote(key);
            }
            self.record_hit();
            return Ok(hit);
        }

        let start = Instant::now();
        let parsed = parse_dtype(key)?;

        let mut cache = self.inner.write();
        if let Some(hit) = cache.get(key) {
            // Another thread parsed the same text first; keep a single handle.
            let hit = hit.clone();
            drop(cache);
            self.record_hit();
            return Ok(hit);
        }

        if cache.len() >= cache.cap().get() && !self.free_slot(&mut cache) {
            log::debug!(
                "[ndtype::types::cache] all {} entries pinned, not caching \"{}\"",
                cache.len(),
                key
            );
            drop(cache);
            self.record_miss(start);
            return Ok(parsed);
        }

        cache.put(Arc::from(key), parsed.clone());
        drop(cache);
        self.record_miss(start);
        Ok(parsed)
    }

    /// Marks `text` as never evictable. May be called before the text is cached.
    pub fn pin(&self, text: &str) {
        self.pinned.insert(Arc::from(text.trim()));
    }

    pub fn unpin(&self, text: &str) {
        self.pinned.remove(text.trim());
    }

    pub fn contains(&self, text: &str) -> bool {
        self.inner.read().contains(text.trim())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Drops every entry, pinned or not. Pins are kept.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    #[must_use]
    pub fn stats(&self) -> LookupStats {
        *self.stats.read()
    }

    fn free_slot(&self, cache: &mut LruCache<Arc<str>, DType>) -> bool {
        let attempts = cache.len();
        for _ in 0..attempts {
            match cache.pop_lru() {
                Some((old_key, old_value)) if self.pinned.contains(&old_key) => {
                    cache.put(old_key, old_value);
                }
                Some((old_key, _)) => {
                    log::trace!("[ndtype::types::cache] evicted \"{}\"", old_key);
                    return true;
                }
                None => break,
            }
        }
        false
    }

    fn record_hit(&self) {
        let mut stats = self.stats.write();
        stats.hits = stats.hits.saturating_add(1);
    }

    fn record_miss(&self, start: Instant) {
        let mut stats = self.stats.write();
        stats.misses = stats.misses.saturating_add(1);
        stats.last_miss_ns = start.elapsed().as_nanos() as u64;
    }
}

/// The process-wide cache, sized from [`RuntimeConfig::type_cache_capacity`] on first use.
///
/// [`RuntimeConfig::type_cache_capacity`]: crate::config::RuntimeConfig::type_cache_capacity
pub fn type_cache() -> &'static TypeCache {
    static CACHE: OnceLock<TypeCache> = OnceLock::new();
    CACHE.get_or_init(|| TypeCache::new(runtime().type_cache_capacity()))
}

/// Parses `text` through the process-wide cache.
pub fn parse_dtype_cached(text: &str) -> Result<DType> {
    type_cache().get_or_parse(text)
}
