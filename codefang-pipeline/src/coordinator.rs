//! The parallel coordinator (spec §5): forks every analyzer into
//! `workers` lanes at the start of each chunk, hands each lane a
//! contiguous, order-preserving slice of that chunk's commits (history
//! analyzers need commits delivered in commit order, so lanes split the
//! work by *range*, not round-robin), runs the lanes concurrently via
//! rayon, then merges lane state back deterministically in worker-id
//! order before handing every TC to its analyzer's aggregator.
//!
//! The fork → dispatch → merge shape follows
//! `drift_analysis::scanner::scanner::Scanner::scan`'s
//! `par_iter().filter_map(...)` dispatch, generalized from
//! embarrassingly-parallel per-file work to ordered per-lane commit
//! replay with an explicit post-batch merge step, since burndown-style
//! history analyzers carry state across commits within a lane.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use codefang_core::analyzer::{Aggregator, AggregatorOptions, Payload};
use codefang_core::errors::{AnalyzerError, CodefangError};
use codefang_core::repository::{Commit, CommitIterStep, CommitIterator, LogOptions, Repository};
use codefang_core::types::{AuthorId, Change, FxHashMap, Hash, Tick, TickAggregate, TickCapsule};
use codefang_core::{Analyzer, Metrics, PipelineConfig};
use rayon::prelude::*;

use crate::cancellation::CancellationToken;
use crate::checkpoint::{CheckpointManager, RunProgress};
use crate::dag::Dag;
use crate::streaming::{self, ChunkPlan};

/// One commit, pre-resolved to a tick and an author id (tick bucketing
/// and identity resolution are plumbing-analyzer concerns this crate
/// depends on but does not implement).
#[derive(Clone)]
pub struct CommitUnit {
    pub commit_hash: Hash,
    pub tick: Tick,
    pub author_id: AuthorId,
    pub timestamp: i64,
    pub changes: Arc<[Change]>,
}

/// Walks `repo`'s log and resolves each commit into a `CommitUnit`,
/// bucketing by `tick_duration_seconds` relative to the first commit
/// seen and resolving authors via the caller-supplied `resolve_author`
/// (the identity-matching algorithm itself is out of scope here, same
/// as diffing and blob loading).
pub fn collect_commit_units<R: Repository>(
    repo: &R,
    options: &LogOptions,
    tick_duration_seconds: i64,
    mut resolve_author: impl FnMut(&str) -> AuthorId,
) -> Result<Vec<CommitUnit>, CodefangError> {
    let mut iter = repo
        .log(options)
        .map_err(CodefangError::Repository)?;
    let mut units = Vec::new();
    let mut base_timestamp: Option<i64> = None;
    let divisor = tick_duration_seconds.max(1);

    loop {
        let step = iter.next().map_err(CodefangError::Repository)?;
        let commit = match step {
            CommitIterStep::Eof => break,
            CommitIterStep::Commit(c) => c,
        };

        let parent_tree = match commit.parents().first() {
            Some(&parent_hash) => {
                let parent = repo
                    .lookup_commit(parent_hash)
                    .map_err(CodefangError::Repository)?;
                Some(parent.tree())
            }
            None => None,
        };
        let changes = repo
            .diff_trees(parent_tree, commit.tree())
            .map_err(CodefangError::Repository)?;

        let timestamp = commit.timestamp();
        let base = *base_timestamp.get_or_insert(timestamp);
        let tick = Tick((timestamp - base) / divisor);

        units.push(CommitUnit {
            commit_hash: commit.hash(),
            tick,
            author_id: resolve_author(commit.author()),
            timestamp,
            changes: Arc::from(changes),
        });
    }
    iter.close();
    Ok(units)
}

pub struct CoordinatorOutcome {
    pub aggregates_by_analyzer: FxHashMap<String, Vec<TickAggregate<Box<dyn Payload>>>>,
}

pub struct ParallelCoordinator {
    config: PipelineConfig,
    cancellation: CancellationToken,
    metrics: Arc<dyn Metrics>,
}

impl ParallelCoordinator {
    pub fn new(config: PipelineConfig, metrics: Arc<dyn Metrics>) -> Self {
        ParallelCoordinator {
            config,
            cancellation: CancellationToken::new(),
            metrics,
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Runs every commit in `units` through `dag`'s analyzers, honoring
    /// checkpoints if `checkpoint` is `Some` and resume is requested.
    ///
    /// `repo_hash` identifies the repository being analyzed and is part
    /// of the checkpoint's run descriptor (spec §4.10): a checkpoint
    /// recorded against a different repository is rejected rather than
    /// silently restored against the wrong history.
    pub fn run(
        &self,
        mut dag: Dag,
        units: Vec<CommitUnit>,
        checkpoint: Option<&CheckpointManager>,
        run_id: &str,
        repo_hash: &str,
    ) -> Result<CoordinatorOutcome, CodefangError> {
        let mut resume_from_chunk = 0usize;
        let mut last_completed_tick: Option<Tick> = None;

        if let Some(manager) = checkpoint.filter(|_| self.config.checkpoint.effective_enabled()) {
            if self.config.checkpoint.resume.unwrap_or(false) {
                match manager.load(repo_hash, dag.analyzers_mut()) {
                    Ok(Some(manifest)) => {
                        resume_from_chunk = manifest.current_chunk + 1;
                        last_completed_tick = manifest.last_completed_tick.map(Tick);
                    }
                    Ok(None) => {}
                    Err(CodefangError::CheckpointInvalid { reason }) => {
                        // spec §7: a descriptor mismatch is a warning, not
                        // a fatal error; the run restarts from chunk 0
                        // with every analyzer left at its fresh state.
                        tracing::warn!(reason = %reason, "checkpoint invalid, starting fresh");
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        // When a memory budget is configured it overrides the explicit
        // `workers`/`commit_batch_size` knobs and drives the solver
        // instead (spec §4.4, §6.3's "memory_budget ... overrides the
        // above and drives the solver"); a budget below the documented
        // floor fails the run rather than silently underprovisioning.
        let per_worker_analyzer_bytes: u64 = dag
            .analyzers()
            .iter()
            .map(|a| a.working_state_size() as u64)
            .sum();
        let (workers, commit_batch_size_floor) = match self.config.memory_budget {
            Some(budget) => {
                let solution = codefang_resources::budget::solve(
                    budget,
                    self.config.effective_workers(),
                    per_worker_analyzer_bytes,
                )
                .map_err(|e| CodefangError::BudgetTooSmall { reason: e.reason })?;
                (solution.workers, solution.commit_batch_size)
            }
            None => (self.config.effective_workers(), self.config.effective_commit_batch_size()),
        };

        let per_commit_growth: u64 = dag
            .analyzers()
            .iter()
            .map(|a| a.state_growth_per_commit() as u64)
            .sum();
        let ChunkPlan {
            commit_batch_size,
            streaming_enabled,
        } = streaming::plan_chunks(
            self.config.effective_streaming_mode(),
            Some(units.len()),
            commit_batch_size_floor,
            self.config.memory_budget.unwrap_or(512 << 20),
            per_commit_growth.max(1),
        );

        let mut aggregators: FxHashMap<String, Box<dyn Aggregator>> = FxHashMap::default();
        let agg_opts = AggregatorOptions {
            byte_budget: 64 << 20,
            spill_dir: PathBuf::from(self.config.checkpoint.effective_dir()).join("spill"),
        };
        for analyzer in dag.analyzers() {
            if let Some(agg) = analyzer.new_aggregator(&agg_opts) {
                aggregators.insert(analyzer.descriptor().id, agg);
            }
        }

        let chunks: Vec<&[CommitUnit]> = units.chunks(commit_batch_size.max(1)).collect();
        let total_chunks = chunks.len();
        let last_chunk_id = total_chunks.saturating_sub(1);
        let mut processed_commits: usize = chunks
            .iter()
            .take(resume_from_chunk)
            .map(|c| c.len())
            .sum();

        for (chunk_id, chunk) in chunks.into_iter().enumerate() {
            if chunk_id < resume_from_chunk {
                continue;
            }
            if self.cancellation.is_cancelled() {
                break;
            }

            self.metrics.chunk_started(chunk_id, chunk.len());
            let started_at = Instant::now();

            let tcs_by_analyzer = self.run_chunk(&mut dag, chunk, chunk_id, workers)?;
            for (analyzer_id, tcs) in tcs_by_analyzer {
                if let Some(agg) = aggregators.get_mut(&analyzer_id) {
                    for tc in &tcs {
                        agg.extract_tc(tc);
                    }
                }
            }

            if let Some(last) = chunk.last() {
                last_completed_tick = Some(last.tick);
            }
            processed_commits += chunk.len();
            self.metrics
                .chunk_completed(chunk_id, started_at.elapsed().as_millis() as u64);

            if let Some(manager) = checkpoint.filter(|_| self.config.checkpoint.effective_enabled())
            {
                let progress = RunProgress {
                    current_chunk: chunk_id,
                    total_chunks,
                    processed_commits,
                };
                manager.save(run_id, repo_hash, last_completed_tick, dag.analyzers(), progress)?;
            }

            if streaming_enabled && chunk_id != last_chunk_id {
                streaming::hibernate_all(dag.analyzers_mut());
                streaming::boot_all(dag.analyzers_mut());
            }
        }

        let aggregates_by_analyzer = aggregators
            .into_iter()
            .map(|(id, mut agg)| (id, agg.finalize()))
            .collect();

        Ok(CoordinatorOutcome {
            aggregates_by_analyzer,
        })
    }

    /// Forks every analyzer into `workers` lanes, splits `chunk` into
    /// contiguous per-lane slices, runs them concurrently, merges lane
    /// state back into `dag` in worker-id order, and returns every TC
    /// produced, keyed by analyzer id.
    fn run_chunk(
        &self,
        dag: &mut Dag,
        chunk: &[CommitUnit],
        chunk_id: usize,
        workers: usize,
    ) -> Result<FxHashMap<String, Vec<TickCapsule<Box<dyn Payload>>>>, CodefangError> {
        if chunk.is_empty() {
            return Ok(FxHashMap::default());
        }
        let workers = workers.max(1).min(chunk.len());

        let lane_slices = split_evenly(chunk, workers);

        // Fork: analyzers[i].fork(workers) returns one Vec<Box<dyn
        // Analyzer>> of length `workers` per analyzer; transpose into
        // one Vec<Box<dyn Analyzer>> (the full analyzer set) per lane.
        let forked_per_analyzer: Vec<Vec<Box<dyn Analyzer>>> = dag
            .analyzers()
            .iter()
            .map(|a| a.fork(workers))
            .collect();
        let mut lanes: Vec<Vec<Box<dyn Analyzer>>> = (0..workers).map(|_| Vec::new()).collect();
        for mut per_worker in forked_per_analyzer {
            for (lane_idx, replica) in per_worker.drain(..).enumerate() {
                lanes[lane_idx].push(replica);
            }
        }

        let cancelled_flag = self.cancellation.shared_flag();
        let results: Vec<Result<LaneResult, CodefangError>> = lanes
            .into_par_iter()
            .zip(lane_slices.into_par_iter())
            .map(|(lane_analyzers, slice)| {
                run_lane(lane_analyzers, slice, cancelled_flag.clone())
            })
            .collect();

        let mut tcs_by_analyzer: FxHashMap<String, Vec<TickCapsule<Box<dyn Payload>>>> =
            FxHashMap::default();
        let mut branches_per_analyzer: Vec<Vec<Box<dyn Analyzer>>> =
            (0..dag.len()).map(|_| Vec::new()).collect();

        for result in results {
            let lane = result?;
            for (idx, analyzer) in lane.analyzers.into_iter().enumerate() {
                branches_per_analyzer[idx].push(analyzer);
            }
            for (analyzer_id, tcs) in lane.tcs_by_analyzer {
                tcs_by_analyzer.entry(analyzer_id).or_default().extend(tcs);
            }
        }

        for (idx, analyzer) in dag.analyzers_mut().iter_mut().enumerate() {
            let branches = std::mem::take(&mut branches_per_analyzer[idx]);
            let merge_started = Instant::now();
            let analyzer_id = analyzer.descriptor().id;
            analyzer.merge(branches);
            self.metrics.lane_merge(
                chunk_id,
                &analyzer_id,
                merge_started.elapsed().as_millis() as u64,
            );
        }

        Ok(tcs_by_analyzer)
    }
}

struct LaneResult {
    analyzers: Vec<Box<dyn Analyzer>>,
    tcs_by_analyzer: FxHashMap<String, Vec<TickCapsule<Box<dyn Payload>>>>,
}

fn run_lane(
    mut analyzers: Vec<Box<dyn Analyzer>>,
    slice: &[CommitUnit],
    cancelled: Arc<std::sync::atomic::AtomicBool>,
) -> Result<LaneResult, CodefangError> {
    let mut tcs_by_analyzer: FxHashMap<String, Vec<TickCapsule<Box<dyn Payload>>>> =
        FxHashMap::default();

    for unit in slice {
        if cancelled.load(std::sync::atomic::Ordering::Relaxed) {
            break;
        }
        let mut ctx = codefang_core::analyzer::ConsumeContext::new(
            unit.commit_hash,
            unit.tick,
            unit.author_id,
            unit.timestamp,
            unit.changes.clone(),
            cancelled.clone(),
        );

        let mut snapshots = Vec::new();
        for analyzer in analyzers.iter_mut() {
            if let Some(snapshot) = analyzer.snapshot_plumbing() {
                snapshots.push(snapshot);
            }
        }
        for snapshot in &snapshots {
            ctx.install_plumbing_output(&snapshot.analyzer_id, snapshot.data.clone());
        }

        for analyzer in analyzers.iter_mut() {
            match analyzer.consume(&ctx) {
                Ok(tc) => {
                    let id = analyzer.descriptor().id;
                    tcs_by_analyzer.entry(id).or_default().push(tc);
                }
                Err(err) => {
                    report_analyzer_error(&err);
                    if err.fatal {
                        return Err(CodefangError::Analyzer {
                            analyzer_id: err.analyzer_id,
                            commit_hash: err.commit_hash,
                            cause: err.cause,
                        });
                    }
                }
            }
        }
    }

    Ok(LaneResult {
        analyzers,
        tcs_by_analyzer,
    })
}

fn report_analyzer_error(err: &AnalyzerError) {
    tracing::warn!(
        analyzer_id = %err.analyzer_id,
        commit_hash = %err.commit_hash,
        cause = %err.cause,
        "analyzer failed on commit"
    );
}

/// Splits `items` into `n` contiguous, order-preserving slices as evenly
/// as sizes allow (earlier slices absorb the remainder).
fn split_evenly<T>(items: &[T], n: usize) -> Vec<&[T]> {
    let len = items.len();
    let base = len / n;
    let remainder = len % n;
    let mut out = Vec::with_capacity(n);
    let mut start = 0;
    for i in 0..n {
        let size = base + if i < remainder { 1 } else { 0 };
        out.push(&items[start..start + size]);
        start += size;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_evenly_covers_every_item_exactly_once() {
        let items: Vec<i32> = (0..10).collect();
        let slices = split_evenly(&items, 3);
        let total: usize = slices.iter().map(|s| s.len()).sum();
        assert_eq!(total, 10);
        let flattened: Vec<i32> = slices.into_iter().flatten().copied().collect();
        assert_eq!(flattened, items);
    }

    #[test]
    fn split_evenly_handles_more_workers_than_items() {
        let items = [1, 2];
        let slices = split_evenly(&items, 5);
        assert_eq!(slices.len(), 5);
        assert_eq!(slices.iter().filter(|s| !s.is_empty()).count(), 2);
    }
}
