//! Memory budget solver (spec §4.4).
//!
//! Given a total byte budget, derives worker count, queue depths, cache
//! sizes, and arena sizes. Below a documented floor the solver refuses
//! to produce a workable configuration rather than silently
//! underprovisioning (spec §4.4, §8 scenario 6).

use codefang_core::repository::NativeMemoryLimits;

/// The documented floor below which the solver reports `BudgetTooSmall`
/// instead of deriving a configuration (spec §4.4).
pub const MIN_BUDGET_BYTES: u64 = 128 << 20;

/// A per-worker arena assumed by the solver when deriving `workers`.
const PER_WORKER_ARENA_BYTES: u64 = 4 << 20;

#[derive(Debug, thiserror::Error)]
#[error("memory budget too small: {reason}")]
pub struct BudgetTooSmall {
    pub reason: String,
}

/// Derived coordinator configuration plus a human-readable derivation
/// trace (diagnostics only, never consulted for control flow — SPEC_FULL
/// §4 supplement, grounded on the teacher's `CallGraphStats` pattern of
/// attaching a diagnostics summary next to a computed result).
#[derive(Debug, Clone)]
pub struct BudgetSolution {
    pub workers: usize,
    pub buffer_size: usize,
    pub commit_batch_size: usize,
    pub blob_cache_size: u64,
    pub diff_cache_size: usize,
    pub blob_arena_size: u64,
    pub native_memory_limits: NativeMemoryLimits,
    trace: Vec<String>,
}

impl BudgetSolution {
    pub fn explain(&self) -> &[String] {
        &self.trace
    }
}

/// Derives a `BudgetSolution` for a total byte budget `budget`, assuming
/// `cores` available CPU cores and that every forked analyzer replica
/// costs `per_worker_analyzer_bytes` (the sum of every registered
/// analyzer's `working_state_size()` plus arena overhead).
pub fn solve(
    budget: u64,
    cores: usize,
    per_worker_analyzer_bytes: u64,
) -> Result<BudgetSolution, BudgetTooSmall> {
    if budget < MIN_BUDGET_BYTES {
        return Err(BudgetTooSmall {
            reason: format!(
                "budget {budget} bytes is below the floor of {MIN_BUDGET_BYTES} bytes"
            ),
        });
    }

    let mut trace = Vec::new();
    trace.push(format!("budget = {budget} bytes, cores = {cores}"));

    let worker_overhead = per_worker_analyzer_bytes + PER_WORKER_ARENA_BYTES;
    let max_workers_by_budget = (budget / worker_overhead.max(1)).max(1) as usize;
    let workers = cores.clamp(1, max_workers_by_budget);
    trace.push(format!(
        "worker_overhead = {worker_overhead} bytes => workers = clamp({cores}, 1, {max_workers_by_budget}) = {workers}"
    ));

    let buffer_size = 2 * workers;
    trace.push(format!("buffer_size = 2 * workers = {buffer_size}"));

    // Scale the commit batch down if its estimated footprint would
    // exceed budget/16 (spec §4.4).
    let per_batch_budget = budget / 16;
    let mut commit_batch_size = 100usize;
    if per_worker_analyzer_bytes > 0 {
        let max_batch_by_budget =
            (per_batch_budget / per_worker_analyzer_bytes.max(1)).max(1) as usize;
        if max_batch_by_budget < commit_batch_size {
            commit_batch_size = max_batch_by_budget;
        }
    }
    trace.push(format!("commit_batch_size = {commit_batch_size}"));

    // Remaining budget after worker overhead is split across the caches
    // and arenas; proportions are tuned so the 128 MiB floor still
    // leaves room for all three at their documented defaults.
    let remaining = budget.saturating_sub(workers as u64 * worker_overhead);
    let blob_cache_size = (remaining / 2).max(16 << 20);
    let blob_arena_size = (remaining / 16).clamp(4 << 20, 64 << 20);
    let diff_cache_size = ((remaining / (1 << 12)).clamp(1_000, 200_000)) as usize;
    trace.push(format!(
        "blob_cache_size = {blob_cache_size} bytes, diff_cache_size = {diff_cache_size} entries, blob_arena_size = {blob_arena_size} bytes"
    ));

    let native_memory_limits = NativeMemoryLimits {
        mmap_window_bytes: (budget / 4).max(32 << 20),
        cache_max_bytes: blob_cache_size,
        malloc_arena_count: (workers as u32).clamp(1, 8),
    };
    trace.push(format!(
        "native memory limits: mmap_window = {} bytes, cache_max = {} bytes, malloc_arena_count = {}",
        native_memory_limits.mmap_window_bytes,
        native_memory_limits.cache_max_bytes,
        native_memory_limits.malloc_arena_count
    ));

    Ok(BudgetSolution {
        workers,
        buffer_size,
        commit_batch_size,
        blob_cache_size,
        diff_cache_size,
        blob_arena_size,
        native_memory_limits,
        trace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_budget_below_floor() {
        let err = solve(64 << 20, 8, 1 << 20).unwrap_err();
        assert!(err.reason.contains("128"));
    }

    #[test]
    fn derives_workers_clamped_by_cores() {
        let sol = solve(256 << 20, 4, 1 << 20).unwrap();
        assert!(sol.workers <= 4);
        assert_eq!(sol.buffer_size, 2 * sol.workers);
    }

    #[test]
    fn derives_workers_clamped_by_budget_when_analyzers_are_heavy() {
        // Each worker costs 200 MiB; a 256 MiB budget can't afford more than one.
        let sol = solve(256 << 20, 16, 200 << 20).unwrap();
        assert_eq!(sol.workers, 1);
    }

    #[test]
    fn explain_is_non_empty() {
        let sol = solve(512 << 20, 4, 1 << 20).unwrap();
        assert!(!sol.explain().is_empty());
    }
}
