//! Content-addressed blob cache (spec §4.5).
//!
//! Bounded in bytes (not entries) with LRU eviction, backed by Moka's
//! TinyLFU admission policy with a per-entry byte weigher — the same
//! cache crate and admission strategy the teacher uses for its parse
//! cache (`drift_analysis::parsers::cache::ParseCache`), generalized
//! here to a byte budget instead of an entry count.

use std::sync::atomic::{AtomicU64, Ordering};

use codefang_core::types::{CachedBlob, Hash};
use moka::sync::Cache;

/// Shared, size-bounded store of blob contents keyed by content hash.
/// Reads are lock-free (Moka's internal sharding); writers acquire a
/// shard lock transparently inside Moka.
pub struct BlobCache {
    inner: Cache<Hash, CachedBlob>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl BlobCache {
    /// Creates a cache bounded to `capacity_bytes` total blob size.
    pub fn new(capacity_bytes: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(capacity_bytes)
            .weigher(|_key: &Hash, value: &CachedBlob| -> u32 {
                value.size_in_bytes.min(u32::MAX as usize) as u32
            })
            .build();

        BlobCache {
            inner,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, hash: Hash) -> Option<CachedBlob> {
        match self.inner.get(&hash) {
            Some(blob) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(blob)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, hash: Hash, blob: CachedBlob) {
        self.inner.insert(hash, blob);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let h = self.hits() as f64;
        let m = self.misses() as f64;
        if h + m == 0.0 {
            0.0
        } else {
            h / (h + m)
        }
    }

    pub fn weighted_size(&self) -> u64 {
        self.inner.weighted_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(n: usize) -> CachedBlob {
        CachedBlob::new(vec![0u8; n])
    }

    #[test]
    fn tracks_hits_and_misses() {
        let cache = BlobCache::new(1 << 20);
        let h = Hash::from_bytes([1u8; 20]);
        assert!(cache.get(h).is_none());
        cache.insert(h, blob(16));
        cache.inner.run_pending_tasks();
        assert!(cache.get(h).is_some());
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn evicts_under_byte_pressure() {
        let cache = BlobCache::new(1024);
        for i in 0..64u8 {
            let h = Hash::from_bytes([i; 20]);
            cache.insert(h, blob(256));
        }
        cache.inner.run_pending_tasks();
        assert!(cache.weighted_size() <= 1024);
    }
}
