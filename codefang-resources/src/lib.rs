//! # codefang-resources
//!
//! The resource subsystem (spec §2 component B/C): content-addressed
//! blob cache, diff cache, blob arena, and the memory budget solver
//! that auto-tunes worker counts and cache sizes.

pub mod blob_arena;
pub mod blob_cache;
pub mod budget;
pub mod diff_cache;

pub use blob_arena::BlobArena;
pub use blob_cache::BlobCache;
pub use budget::{solve, BudgetSolution, BudgetTooSmall, MIN_BUDGET_BYTES};
pub use diff_cache::{Diff, DiffCache};
