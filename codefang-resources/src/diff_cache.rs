//! Diff cache (spec §4.5): entry-bounded, never persisted, keyed by the
//! pair of blob hashes being diffed. Used by the `FileDiff` plumbing
//! analyzer to avoid recomputing identical diffs for merge commits,
//! where multiple parents frequently share a diffed pair.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use codefang_core::types::Hash;
use moka::sync::Cache;

/// Opaque diff payload. The diffing algorithm itself (line-level,
/// hunk-based, etc.) is an analyzer concern, out of scope here; the
/// cache only needs a cheaply-clonable handle to it.
pub type Diff = Arc<[u8]>;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct DiffKey {
    from: Hash,
    to: Hash,
}

/// LRU map from `(from_hash, to_hash)` to a computed diff, bounded by
/// entry count (not bytes — diffs vary too widely in size to weigh
/// cheaply, unlike blobs).
pub struct DiffCache {
    inner: Cache<DiffKey, Diff>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DiffCache {
    pub fn new(max_entries: usize) -> Self {
        DiffCache {
            inner: Cache::new(max_entries as u64),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, from: Hash, to: Hash) -> Option<Diff> {
        match self.inner.get(&DiffKey { from, to }) {
            Some(diff) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(diff)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, from: Hash, to: Hash, diff: Diff) {
        self.inner.insert(DiffKey { from, to }, diff);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_by_hash_pair() {
        let cache = DiffCache::new(4);
        let a = Hash::from_bytes([1u8; 20]);
        let b = Hash::from_bytes([2u8; 20]);
        assert!(cache.get(a, b).is_none());
        cache.insert(a, b, Arc::from(vec![1, 2, 3].into_boxed_slice()));
        cache.inner.run_pending_tasks();
        assert!(cache.get(a, b).is_some());
        assert!(cache.get(b, a).is_none());
    }
}
