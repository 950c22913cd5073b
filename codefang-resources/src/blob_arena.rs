//! Blob arena (spec §4.5): a bump-allocated slab reused across commits
//! for short-lived blob loads, avoiding a heap allocation per blob read
//! inside one commit's processing. Exclusively owned per-lane (spec §5).

/// Fixed-capacity bump allocator. `reset()` at the start of each commit
/// reclaims every allocation made during the previous commit in O(1);
/// nothing is ever freed individually.
pub struct BlobArena {
    buffer: Vec<u8>,
    used: usize,
}

/// Error returned when a requested allocation would not fit.
#[derive(Debug, thiserror::Error)]
#[error("blob arena exhausted: requested {requested} bytes, {available} available")]
pub struct ArenaExhausted {
    pub requested: usize,
    pub available: usize,
}

impl BlobArena {
    pub fn new(capacity_bytes: usize) -> Self {
        BlobArena {
            buffer: vec![0u8; capacity_bytes],
            used: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn available(&self) -> usize {
        self.buffer.len() - self.used
    }

    /// Copies `data` into the arena and returns a slice into it. The
    /// returned slice is only valid until the next `reset()`.
    pub fn alloc_copy(&mut self, data: &[u8]) -> Result<&[u8], ArenaExhausted> {
        if data.len() > self.available() {
            return Err(ArenaExhausted {
                requested: data.len(),
                available: self.available(),
            });
        }
        let start = self.used;
        self.buffer[start..start + data.len()].copy_from_slice(data);
        self.used += data.len();
        Ok(&self.buffer[start..start + data.len()])
    }

    /// Reclaims all allocations made since the last reset. Called once
    /// per commit by the lane driving this arena.
    pub fn reset(&mut self) {
        self.used = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_and_tracks_usage() {
        let mut arena = BlobArena::new(16);
        let s = arena.alloc_copy(&[1, 2, 3]).unwrap();
        assert_eq!(s, &[1, 2, 3]);
        assert_eq!(arena.used(), 3);
    }

    #[test]
    fn reset_reclaims_space() {
        let mut arena = BlobArena::new(8);
        arena.alloc_copy(&[0u8; 8]).unwrap();
        assert!(arena.alloc_copy(&[0u8; 1]).is_err());
        arena.reset();
        assert!(arena.alloc_copy(&[0u8; 8]).is_ok());
    }

    #[test]
    fn exhaustion_reports_sizes() {
        let mut arena = BlobArena::new(4);
        let err = arena.alloc_copy(&[0u8; 5]).unwrap_err();
        assert_eq!(err.requested, 5);
        assert_eq!(err.available, 4);
    }
}
