//! The burndown leaf analyzer (spec §4.7): tracks, per file, which tick
//! last touched each line, and folds that into a tick x tick "burndown
//! matrix" (how many lines alive at tick N were last touched at tick M).
//! Unlike the repository/diffing/UAST-parsing analyzers this repo leaves
//! as a dependency seam, the burndown algorithm itself is explicitly in
//! scope: it's the reason the timeline/treap engine exists.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};

use codefang_core::analyzer::{
    Aggregator, AggregatorOptions, AnalyzerDescriptor, AnalyzerMode, ConfigOption, ConsumeContext,
    Fact, Payload,
};
use codefang_core::errors::AnalyzerError;
use codefang_core::types::{ChangeAction, FxHashMap, Tick, TickAggregate, TickCapsule};
use codefang_core::Analyzer;

use crate::file::File;

/// One contiguous edit to a file's lines, as produced by the diffing
/// plumbing analyzer this crate depends on but does not implement
/// (diff computation is out of scope here, same as blob loading and
/// UAST parsing — see the `diff_cache` module in `codefang-resources`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineHunk {
    pub pos: u64,
    pub del: u64,
    pub ins: u64,
}

/// The published fact name this analyzer expects line hunks under.
pub const FILE_DIFF_HUNKS_FACT: &str = "file_diff_hunks";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HunkBatch {
    pub by_path: FxHashMap<String, Vec<LineHunk>>,
}

impl Payload for HunkBatch {
    fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Payload> {
        Box::new(self.clone())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "touched_paths": self.by_path.len() })
    }
}

/// Per-commit burndown delta: for every tick whose lines were displaced
/// this commit, how many lines were removed, plus how many fresh lines
/// this commit added (attributed to its own tick).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BurndownDelta {
    pub tick: Tick,
    pub added: u64,
    pub removed_by_tick: FxHashMap<Tick, u64>,
}

impl Payload for BurndownDelta {
    fn is_empty(&self) -> bool {
        self.added == 0 && self.removed_by_tick.is_empty()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Payload> {
        Box::new(self.clone())
    }

    fn to_json(&self) -> serde_json::Value {
        let removed: serde_json::Map<String, serde_json::Value> = self
            .removed_by_tick
            .iter()
            .map(|(tick, count)| (tick.0.to_string(), serde_json::json!(count)))
            .collect();
        serde_json::json!({
            "tick": self.tick.0,
            "added": self.added,
            "removed_by_tick": removed,
        })
    }
}

/// Leaf analyzer maintaining one `File` timeline per path.
#[derive(Debug)]
pub struct BurndownAnalyzer {
    files: FxHashMap<String, File>,
    seed_counter: AtomicU64,
}

impl Default for BurndownAnalyzer {
    fn default() -> Self {
        BurndownAnalyzer {
            files: FxHashMap::default(),
            seed_counter: AtomicU64::new(1),
        }
    }
}

impl BurndownAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seed(&self) -> u64 {
        self.seed_counter.fetch_add(1, Ordering::Relaxed)
    }
}

impl Analyzer for BurndownAnalyzer {
    fn descriptor(&self) -> AnalyzerDescriptor {
        AnalyzerDescriptor {
            id: "burndown".to_string(),
            description: "Line-survival burndown matrix keyed by tick".to_string(),
            mode: AnalyzerMode::History,
        }
    }

    fn list_configuration_options(&self) -> Vec<ConfigOption> {
        Vec::new()
    }

    fn configure(
        &mut self,
        _facts: &[Fact],
    ) -> Result<(), codefang_core::errors::ConfigurationError> {
        Ok(())
    }

    fn consume(
        &mut self,
        ctx: &ConsumeContext,
    ) -> Result<TickCapsule<Box<dyn Payload>>, AnalyzerError> {
        let mut delta = BurndownDelta {
            tick: ctx.tick,
            ..Default::default()
        };

        let hunks = ctx
            .plumbing_output(FILE_DIFF_HUNKS_FACT)
            .and_then(|p| codefang_core::analyzer::payload::downcast::<HunkBatch>(p));

        for change in ctx.changes.iter() {
            let Some(path) = change.effective_path() else {
                continue;
            };
            match change.action {
                ChangeAction::Delete => {
                    if let Some(mut file) = self.files.remove(path) {
                        let removed = file.timeline.flatten();
                        for value in removed {
                            if value < 0 {
                                continue;
                            }
                            *delta.removed_by_tick.entry(Tick(value)).or_default() += 1;
                        }
                        file.erase();
                    }
                }
                ChangeAction::Insert | ChangeAction::Modify | ChangeAction::Rename => {
                    let seed = self.next_seed();
                    let file = self
                        .files
                        .entry(path.to_string())
                        .or_insert_with(|| File::new(ctx.tick.0 as u32, ctx.author_id, 0, seed));

                    let path_hunks = hunks.and_then(|h| h.by_path.get(path));
                    if let Some(path_hunks) = path_hunks {
                        for hunk in path_hunks {
                            let report = file.replace(
                                hunk.pos,
                                hunk.del,
                                hunk.ins,
                                ctx.tick.0 as u32,
                                ctx.author_id,
                            );
                            delta.added += hunk.ins;
                            for r in report {
                                if r.value == crate::timeline::TREE_END {
                                    continue;
                                }
                                *delta.removed_by_tick.entry(Tick(r.value as i64)).or_default() +=
                                    r.lines;
                            }
                        }
                    }
                }
            }
        }

        Ok(TickCapsule {
            commit_hash: ctx.commit_hash,
            tick: ctx.tick,
            timestamp: ctx.timestamp,
            data: Box::new(delta),
        })
    }

    fn fork(&self, n: usize) -> Vec<Box<dyn Analyzer>> {
        // Mutable state (the per-path timelines and the seed counter)
        // must be deep-copied into every replica: a lane that started
        // from a blank `files` map would re-seed every already-tracked
        // path as brand new, corrupting position arithmetic against the
        // file's real (nonzero) prior length.
        let seed = self.seed_counter.load(Ordering::Relaxed);
        (0..n)
            .map(|_| {
                Box::new(BurndownAnalyzer {
                    files: self.files.clone(),
                    seed_counter: AtomicU64::new(seed),
                }) as Box<dyn Analyzer>
            })
            .collect()
    }

    fn merge(&mut self, branches: Vec<Box<dyn Analyzer>>) {
        for branch in branches {
            let Some(other) = branch.as_any().downcast_ref::<BurndownAnalyzer>() else {
                continue;
            };
            for (path, other_file) in &other.files {
                match self.files.get_mut(path) {
                    Some(existing) => {
                        // Lanes fork from a shared ancestor but process
                        // disjoint commit ranges, so they routinely end
                        // up at different lengths; `Timeline::merge`
                        // (the git-merge-commit algorithm, which asserts
                        // equal lengths) is the wrong tool here.
                        existing.merge_lanes(std::slice::from_ref(other_file));
                    }
                    None => {
                        self.files.insert(path.clone(), other_file.clone());
                    }
                }
            }
            self.seed_counter.fetch_max(
                other.seed_counter.load(Ordering::Relaxed),
                Ordering::Relaxed,
            );
        }
    }

    fn new_aggregator(&self, opts: &AggregatorOptions) -> Option<Box<dyn Aggregator>> {
        Some(Box::new(BurndownAggregator::new(opts.clone())))
    }

    fn working_state_size(&self) -> usize {
        self.files.len() * 256
    }

    fn avg_tc_size(&self) -> usize {
        128
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Folds per-commit `BurndownDelta`s into a cumulative tick x tick
/// matrix: `matrix[current_tick][origin_tick]` is how many lines alive
/// at `current_tick` were last touched at `origin_tick`.
#[derive(Debug)]
pub struct BurndownAggregator {
    _opts: AggregatorOptions,
    matrix: FxHashMap<Tick, FxHashMap<Tick, i64>>,
    min_in_flight: Option<Tick>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BurndownMatrixRow {
    pub tick: Tick,
    pub by_origin_tick: FxHashMap<Tick, i64>,
}

impl Payload for BurndownMatrixRow {
    fn is_empty(&self) -> bool {
        self.by_origin_tick.is_empty()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Payload> {
        Box::new(self.clone())
    }

    fn to_json(&self) -> serde_json::Value {
        let by_origin: serde_json::Map<String, serde_json::Value> = self
            .by_origin_tick
            .iter()
            .map(|(tick, count)| (tick.0.to_string(), serde_json::json!(count)))
            .collect();
        serde_json::json!({
            "tick": self.tick.0,
            "by_origin_tick": by_origin,
        })
    }
}

impl BurndownAggregator {
    pub fn new(opts: AggregatorOptions) -> Self {
        BurndownAggregator {
            _opts: opts,
            matrix: FxHashMap::default(),
            min_in_flight: None,
        }
    }

    fn row_mut(&mut self, tick: Tick) -> &mut FxHashMap<Tick, i64> {
        self.matrix.entry(tick).or_default()
    }
}

impl Aggregator for BurndownAggregator {
    fn extract_tc(&mut self, tc: &TickCapsule<Box<dyn Payload>>) {
        let Some(delta) = codefang_core::analyzer::payload::downcast::<BurndownDelta>(&*tc.data)
        else {
            return;
        };
        self.min_in_flight = Some(match self.min_in_flight {
            Some(existing) if existing.0 <= tc.tick.0 => existing,
            _ => tc.tick,
        });
        if delta.added > 0 {
            *self.row_mut(tc.tick).entry(tc.tick).or_default() += delta.added as i64;
        }
        for (origin, removed) in &delta.removed_by_tick {
            *self.row_mut(tc.tick).entry(*origin).or_default() -= *removed as i64;
        }
    }

    fn merge_state(&mut self, mut other: Box<dyn Aggregator>) {
        let Some(other) = other.as_any_mut().downcast_mut::<BurndownAggregator>() else {
            return;
        };
        let matrix = std::mem::take(&mut other.matrix);
        for (tick, row) in matrix {
            let dest = self.row_mut(tick);
            for (origin, delta) in row {
                *dest.entry(origin).or_default() += delta;
            }
        }
    }

    fn finalize(&mut self) -> Vec<TickAggregate<Box<dyn Payload>>> {
        let mut ticks: Vec<Tick> = self.matrix.keys().copied().collect();
        ticks.sort_by_key(|t| t.0);

        let mut cumulative: FxHashMap<Tick, i64> = FxHashMap::default();
        let mut out = Vec::with_capacity(ticks.len());
        for tick in ticks {
            if let Some(row) = self.matrix.get(&tick) {
                for (origin, delta) in row {
                    *cumulative.entry(*origin).or_default() += delta;
                }
            }
            let snapshot = BurndownMatrixRow {
                tick,
                by_origin_tick: cumulative.clone(),
            };
            out.push(TickAggregate {
                tick,
                start_time: 0,
                end_time: 0,
                data: Box::new(snapshot) as Box<dyn Payload>,
                truncated: false,
            });
        }
        out
    }

    fn estimated_bytes(&self) -> usize {
        self.matrix.values().map(|r| r.len() * 24).sum::<usize>() + 64
    }

    fn min_in_flight_tick(&self) -> Option<Tick> {
        self.min_in_flight
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codefang_core::types::{AuthorId, Change, ChangeEntry, Hash};
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn ctx(tick: i64, path: &str, hunk: LineHunk, author: i64) -> ConsumeContext {
        let entry = ChangeEntry {
            path: path.to_string(),
            blob_hash: Hash::ZERO,
        };
        let mut ctx = ConsumeContext::new(
            Hash::ZERO,
            Tick(tick),
            AuthorId(author),
            tick * 86_400,
            Arc::from(vec![Change::modify(entry.clone(), entry)]),
            Arc::new(AtomicBool::new(false)),
        );
        let mut hunks = HunkBatch::default();
        hunks.by_path.insert(path.to_string(), vec![hunk]);
        ctx.install_plumbing_output(FILE_DIFF_HUNKS_FACT, Box::new(hunks));
        ctx
    }

    #[test]
    fn consume_tracks_insertions_as_added_lines() {
        let mut analyzer = BurndownAnalyzer::new();
        let commit_ctx = ctx(
            1,
            "src/lib.rs",
            LineHunk {
                pos: 0,
                del: 0,
                ins: 10,
            },
            7,
        );
        let tc = analyzer.consume(&commit_ctx).unwrap();
        let delta =
            codefang_core::analyzer::payload::downcast::<BurndownDelta>(&*tc.data).unwrap();
        assert_eq!(delta.added, 10);
        assert!(delta.removed_by_tick.is_empty());
    }

    #[test]
    fn aggregator_finalizes_nondecreasing_tick_sequence() {
        let mut analyzer = BurndownAnalyzer::new();
        let opts = AggregatorOptions {
            byte_budget: 1 << 20,
            spill_dir: std::env::temp_dir(),
        };
        let mut aggregator = analyzer.new_aggregator(&opts).unwrap();

        let c1 = ctx(1, "a.rs", LineHunk { pos: 0, del: 0, ins: 5 }, 1);
        let tc1 = analyzer.consume(&c1).unwrap();
        aggregator.extract_tc(&tc1);

        let c2 = ctx(2, "a.rs", LineHunk { pos: 0, del: 2, ins: 1 }, 2);
        let tc2 = analyzer.consume(&c2).unwrap();
        aggregator.extract_tc(&tc2);

        let rows = aggregator.finalize();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].tick, Tick(1));
        assert_eq!(rows[1].tick, Tick(2));
    }

    #[test]
    fn fork_deep_copies_existing_files_instead_of_starting_blank() {
        let mut analyzer = BurndownAnalyzer::new();
        let seed_ctx = ctx(1, "a.rs", LineHunk { pos: 0, del: 0, ins: 10 }, 1);
        analyzer.consume(&seed_ctx).unwrap();

        let lanes = analyzer.fork(2);
        for lane in &lanes {
            let lane = lane.as_any().downcast_ref::<BurndownAnalyzer>().unwrap();
            let file = lane.files.get("a.rs").expect("forked lane keeps known files");
            assert_eq!(file.len(), 10);
        }
    }

    #[test]
    fn merge_reconciles_lanes_that_diverged_to_different_lengths() {
        let mut canonical = BurndownAnalyzer::new();
        let seed_ctx = ctx(1, "a.rs", LineHunk { pos: 0, del: 0, ins: 10 }, 1);
        canonical.consume(&seed_ctx).unwrap();

        let mut lanes = canonical.fork(2);
        let lane_a = lanes[0].as_any_mut().downcast_mut::<BurndownAnalyzer>().unwrap();
        lane_a
            .consume(&ctx(2, "a.rs", LineHunk { pos: 10, del: 0, ins: 4 }, 2))
            .unwrap();
        let lane_b = lanes[1].as_any_mut().downcast_mut::<BurndownAnalyzer>().unwrap();
        lane_b
            .consume(&ctx(3, "a.rs", LineHunk { pos: 0, del: 2, ins: 0 }, 3))
            .unwrap();

        // Must not panic even though the two lanes ended at different
        // lengths (14 vs 8 lines).
        canonical.merge(lanes);
        let merged = canonical.files.get("a.rs").unwrap();
        assert_eq!(merged.len(), 14);
    }
}
