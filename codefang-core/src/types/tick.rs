//! Tick windows and author identities (spec §3.1).

use std::ops::{Add, Sub};

/// Signed count of elapsed tick windows (default 24h) since the first
/// analyzed commit. Tick 0 is the earliest analyzed commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Tick(pub i64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    pub fn value(self) -> i64 {
        self.0
    }
}

impl Add<i64> for Tick {
    type Output = Tick;
    fn add(self, rhs: i64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl Sub for Tick {
    type Output = i64;
    fn sub(self, rhs: Tick) -> i64 {
        self.0 - rhs.0
    }
}

/// Dense id produced by an external identity detector mapping canonical
/// author keys to ids. Negative values are reserved sentinels (e.g. the
/// "unmatched author" bucket).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct AuthorId(pub i64);

impl AuthorId {
    /// Sentinel for commits whose author could not be resolved.
    pub const UNMATCHED: AuthorId = AuthorId(-1);

    pub fn is_sentinel(self) -> bool {
        self.0 < 0
    }
}
