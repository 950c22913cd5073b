//! Tick Capsules (TC) and Tick Aggregates (TICK) — spec §3.2.
//!
//! The source stores `TC.Data`/`TICK.Data` as an opaque `any`. Per the
//! design note in spec §9 we make both generic over an analyzer-defined
//! payload type instead; the coordinator holds per-analyzer TCs behind a
//! trait object (see `codefang-pipeline::dag::AnyAnalyzer`).

use super::hash::Hash;
use super::tick::Tick;

/// Per-commit output of a leaf analyzer. A `data` of `D::default()` means
/// "nothing to report for this commit" per spec §3.2.
#[derive(Debug, Clone)]
pub struct TickCapsule<D> {
    pub commit_hash: Hash,
    pub tick: Tick,
    pub timestamp: i64,
    pub data: D,
}

impl<D: Default + PartialEq> TickCapsule<D> {
    pub fn is_empty(&self) -> bool {
        self.data == D::default()
    }
}

/// Per-tick fold of all TCs sharing the same tick, produced by an
/// aggregator (spec §4.8).
#[derive(Debug, Clone)]
pub struct TickAggregate<D> {
    pub tick: Tick,
    pub start_time: i64,
    pub end_time: i64,
    pub data: D,
    /// Set by the coordinator when a cancel signal truncated this tick's
    /// input (spec §5, Cancellation & timeouts).
    pub truncated: bool,
}
