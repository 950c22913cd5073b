//! # codefang-timeline
//!
//! The treap-backed line timeline (spec §4.7) and the burndown leaf
//! analyzer built on top of it.

pub mod arena;
pub mod burndown;
pub mod file;
pub mod prng;
pub mod timeline;

pub use burndown::{
    BurndownAggregator, BurndownAnalyzer, BurndownDelta, BurndownMatrixRow, HunkBatch, LineHunk,
    FILE_DIFF_HUNKS_FACT,
};
pub use file::File;
pub use prng::XorShift64;
pub use timeline::{DeltaReport, Timeline, TREE_END, TREE_MERGE_MARK};
