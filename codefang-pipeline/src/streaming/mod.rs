//! Streaming/chunking (spec §4.9): decides how many commits to pull into
//! memory at once, and drives `Analyzer::hibernate`/`boot` between
//! chunks when streaming is active. The batch-size heuristic mirrors
//! `drift_analysis::scanner::scanner::Scanner`'s progress-chunking
//! (processing happens in bounded units with periodic progress
//! callbacks) generalized from a fixed chunk size to one derived from
//! the memory budget.

use codefang_core::config::StreamingMode;
use codefang_core::Analyzer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub commit_batch_size: usize,
    pub streaming_enabled: bool,
}

/// Resolves `StreamingMode::Auto` against the estimated peak footprint
/// of running the whole history unchunked (`commit_count_hint *
/// per_commit_growth_bytes`): `Auto` turns streaming on only when that
/// estimate would exceed `budget_bytes`, not off a fixed commit-count
/// threshold, since a small budget makes even a short history worth
/// chunking and a huge budget can absorb a long one in one pass.
/// Also shrinks `configured_batch_size` if the analyzer set's combined
/// per-commit growth would blow the byte budget before a chunk boundary.
pub fn plan_chunks(
    mode: StreamingMode,
    commit_count_hint: Option<usize>,
    configured_batch_size: usize,
    budget_bytes: u64,
    per_commit_growth_bytes: u64,
) -> ChunkPlan {
    let streaming_enabled = match mode {
        StreamingMode::On => true,
        StreamingMode::Off => false,
        StreamingMode::Auto => commit_count_hint
            .map(|n| (n as u64).saturating_mul(per_commit_growth_bytes) > budget_bytes)
            .unwrap_or(false),
    };

    let mut commit_batch_size = configured_batch_size.max(1);
    if per_commit_growth_bytes > 0 {
        let max_batch_by_budget = (budget_bytes / per_commit_growth_bytes.max(1)).max(1) as usize;
        commit_batch_size = commit_batch_size.min(max_batch_by_budget);
    }

    ChunkPlan {
        commit_batch_size,
        streaming_enabled,
    }
}

/// Calls `hibernate()` on every analyzer that opts in, at a chunk
/// boundary. Cheap no-op for analyzers that don't override it.
pub fn hibernate_all(analyzers: &mut [Box<dyn Analyzer>]) {
    for analyzer in analyzers.iter_mut() {
        if analyzer.supports_hibernation() {
            analyzer.hibernate();
        }
    }
}

/// Reverses `hibernate_all` before the next chunk starts.
pub fn boot_all(analyzers: &mut [Box<dyn Analyzer>]) {
    for analyzer in analyzers.iter_mut() {
        if analyzer.supports_hibernation() {
            analyzer.boot();
        }
    }
}
