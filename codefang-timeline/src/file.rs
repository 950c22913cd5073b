//! `File`: a timeline wrapper that keeps a secondary, author-keyed
//! timeline in lockstep with the primary tick-keyed one. Both are driven
//! from the same line ranges, so a single edit simultaneously updates
//! "which tick last touched this line" and "which author last touched
//! this line" — the two burndown dimensions spec §4.7 asks for (a line
//! count matrix per tick, and one per author).
//!
//! The source generalizes this to an open-ended list of auxiliary
//! timelines keyed by arbitrary dimensions; this reimplementation fixes
//! the set to the two dimensions the spec's burndown report actually
//! needs; see the matching entry in DESIGN.md.

use codefang_core::types::AuthorId;

use crate::timeline::{DeltaReport, Timeline};

#[derive(Debug, Clone)]
pub struct File {
    pub timeline: Timeline,
    pub by_author: Timeline,
}

impl File {
    pub fn new(time: u32, author: AuthorId, length: u32, seed: u64) -> Self {
        File {
            timeline: Timeline::new(time, length, seed),
            by_author: Timeline::new(author.0 as u32, length, seed ^ 0xA5A5_A5A5_A5A5_A5A5),
        }
    }

    pub fn len(&self) -> u64 {
        self.timeline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    /// Applies one edit to both dimensions. Returns the tick-dimension
    /// delta report (what the burndown-by-tick aggregator consumes).
    pub fn replace(
        &mut self,
        pos: u64,
        del: u64,
        ins: u64,
        time: u32,
        author: AuthorId,
    ) -> Vec<DeltaReport> {
        let report = self.timeline.replace(pos, del, ins, time);
        self.by_author.replace(pos, del, ins, author.0 as u32);
        report
    }

    pub fn erase(&mut self) {
        self.timeline.erase();
        self.by_author.erase();
    }

    pub fn merge_adjacent_same_value(&mut self) {
        self.timeline.merge_adjacent_same_value();
        self.by_author.merge_adjacent_same_value();
    }

    pub fn shrink_pool(&mut self, keep: usize) {
        self.timeline.shrink_pool(keep);
        self.by_author.shrink_pool(keep);
    }

    /// Reconciles this file with its other parents at a merge commit.
    pub fn merge(&mut self, others: &[File], merge_day: u32, merge_author: AuthorId) {
        let timelines: Vec<Timeline> = others.iter().map(|f| f.timeline.clone()).collect();
        self.timeline.merge(&timelines, merge_day);
        let author_timelines: Vec<Timeline> = others.iter().map(|f| f.by_author.clone()).collect();
        self.by_author.merge(&author_timelines, merge_author.0 as u32);
    }

    /// Reconciles this file with parallel worker-lane replicas of the
    /// same path. Lanes processed disjoint commit ranges forked from a
    /// shared ancestor, so (unlike `merge`'s merge-commit parents) they
    /// routinely end up at different lengths; see `Timeline::reconcile_lanes`.
    pub fn merge_lanes(&mut self, others: &[File]) {
        let timelines: Vec<Timeline> = others.iter().map(|f| f.timeline.clone()).collect();
        self.timeline.reconcile_lanes(&timelines);
        let author_timelines: Vec<Timeline> = others.iter().map(|f| f.by_author.clone()).collect();
        self.by_author.reconcile_lanes(&author_timelines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_keeps_both_dimensions_in_sync() {
        let mut f = File::new(1, AuthorId(10), 5, 1);
        f.replace(1, 2, 3, 2, AuthorId(20));
        assert_eq!(f.timeline.len(), f.by_author.len());
        assert_eq!(f.timeline.flatten().len(), f.by_author.flatten().len());
    }

    #[test]
    fn erase_empties_both_dimensions() {
        let mut f = File::new(1, AuthorId(1), 5, 1);
        f.erase();
        assert!(f.is_empty());
        assert!(f.by_author.is_empty());
    }

    #[test]
    fn merge_lanes_tolerates_lanes_that_end_at_different_lengths() {
        let base = File::new(1, AuthorId(1), 4, 1);
        let mut grew = base.clone();
        grew.replace(4, 0, 2, 5, AuthorId(2));
        let mut shrank = base.clone();
        shrank.replace(0, 1, 0, 5, AuthorId(3));

        let mut canonical = base.clone();
        canonical.merge_lanes(&[grew, shrank]);
        assert_eq!(canonical.timeline.len(), canonical.by_author.len());
        assert_eq!(canonical.timeline.len(), 6);
    }
}
