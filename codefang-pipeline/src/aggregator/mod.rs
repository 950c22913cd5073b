//! Generic, closure-driven `Aggregator` (spec §4.8): "a generic
//! aggregator parameterized by three functions" — extract one TC into a
//! per-tick accumulator, merge two accumulators, and finalize one into a
//! report payload. Concrete leaf analyzers (e.g. line-count analyzers
//! that don't need the treap machinery `codefang-timeline` provides) can
//! reuse this instead of hand-rolling the spill/merge bookkeeping every
//! time, the same way the teacher factors shared bookkeeping out of
//! per-analyzer logic in `drift-analysis::call_graph::builder`.

use std::fs;
use std::path::PathBuf;

use codefang_core::analyzer::{Aggregator, AggregatorOptions, Payload};
use codefang_core::types::{FxHashMap, FxHashSet, Tick, TickAggregate, TickCapsule};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Per-tick accumulator state plus the three behaviors that turn a
/// stream of TCs into a finalized report (spec §4.8).
pub trait AggregatorLogic: Send {
    type State: Default + Serialize + DeserializeOwned + Send;

    /// Folds one TC's payload into `state`.
    fn extract(&self, state: &mut Self::State, tc: &TickCapsule<Box<dyn Payload>>);

    /// Folds `other` into `state` (associative/commutative).
    fn combine(&self, state: &mut Self::State, other: Self::State);

    /// Turns one tick's finalized accumulator into a report payload.
    fn finalize_tick(&self, tick: Tick, state: Self::State) -> Box<dyn Payload>;

    /// Rough per-entry byte cost, used for the spill threshold.
    fn estimated_bytes(&self, state: &Self::State) -> usize;
}

pub struct GenericAggregator<L: AggregatorLogic> {
    logic: L,
    opts: AggregatorOptions,
    in_memory: FxHashMap<Tick, L::State>,
    spilled: FxHashSet<Tick>,
    min_in_flight: Option<Tick>,
}

impl<L: AggregatorLogic> GenericAggregator<L> {
    pub fn new(logic: L, opts: AggregatorOptions) -> Self {
        GenericAggregator {
            logic,
            opts,
            in_memory: FxHashMap::default(),
            spilled: FxHashSet::default(),
            min_in_flight: None,
        }
    }

    fn spill_path(&self, tick: Tick) -> PathBuf {
        self.opts.spill_dir.join(format!("tick-{}.json", tick.0))
    }

    fn spill_oldest(&mut self) {
        let Some(&oldest) = self.in_memory.keys().min_by_key(|t| t.0) else {
            return;
        };
        if let Some(state) = self.in_memory.remove(&oldest) {
            if fs::create_dir_all(&self.opts.spill_dir).is_ok() {
                if let Ok(bytes) = serde_json::to_vec(&state) {
                    let _ = fs::write(self.spill_path(oldest), bytes);
                    self.spilled.insert(oldest);
                    return;
                }
            }
            // Spill failed; keep the state in memory rather than lose it.
            self.in_memory.insert(oldest, state);
        }
    }

    fn unspill(&mut self, tick: Tick) -> Option<L::State> {
        if !self.spilled.remove(&tick) {
            return None;
        }
        let bytes = fs::read(self.spill_path(tick)).ok()?;
        let state: L::State = serde_json::from_slice(&bytes).ok()?;
        let _ = fs::remove_file(self.spill_path(tick));
        Some(state)
    }
}

impl<L: AggregatorLogic + 'static> Aggregator for GenericAggregator<L> {
    fn extract_tc(&mut self, tc: &TickCapsule<Box<dyn Payload>>) {
        self.min_in_flight = Some(match self.min_in_flight {
            Some(existing) if existing.0 <= tc.tick.0 => existing,
            _ => tc.tick,
        });

        let mut state = self
            .unspill(tc.tick)
            .or_else(|| self.in_memory.remove(&tc.tick))
            .unwrap_or_default();
        self.logic.extract(&mut state, tc);
        self.in_memory.insert(tc.tick, state);

        if self.estimated_bytes() > self.opts.byte_budget && self.in_memory.len() > 1 {
            self.spill_oldest();
        }
    }

    fn merge_state(&mut self, mut other: Box<dyn Aggregator>) {
        let Some(other) = other
            .as_any_mut()
            .downcast_mut::<GenericAggregator<L>>()
        else {
            return;
        };

        let other_spilled: Vec<Tick> = other.spilled.iter().copied().collect();
        for tick in other_spilled {
            if let Some(state) = other.unspill(tick) {
                other.in_memory.insert(tick, state);
            }
        }

        for (tick, state) in std::mem::take(&mut other.in_memory) {
            match self.unspill(tick).or_else(|| self.in_memory.remove(&tick)) {
                Some(mut existing) => {
                    self.logic.combine(&mut existing, state);
                    self.in_memory.insert(tick, existing);
                }
                None => {
                    self.in_memory.insert(tick, state);
                }
            }
        }

        self.min_in_flight = match (self.min_in_flight, other.min_in_flight) {
            (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
            (a, None) => a,
            (None, b) => b,
        };
    }

    fn finalize(&mut self) -> Vec<TickAggregate<Box<dyn Payload>>> {
        let spilled_ticks: Vec<Tick> = self.spilled.iter().copied().collect();
        for tick in spilled_ticks {
            if let Some(state) = self.unspill(tick) {
                self.in_memory.insert(tick, state);
            }
        }

        let mut ticks: Vec<Tick> = self.in_memory.keys().copied().collect();
        ticks.sort_by_key(|t| t.0);

        ticks
            .into_iter()
            .map(|tick| {
                let state = self.in_memory.remove(&tick).unwrap_or_default();
                let data = self.logic.finalize_tick(tick, state);
                TickAggregate {
                    tick,
                    start_time: 0,
                    end_time: 0,
                    data,
                    truncated: false,
                }
            })
            .collect()
    }

    fn estimated_bytes(&self) -> usize {
        self.in_memory
            .values()
            .map(|s| self.logic.estimated_bytes(s))
            .sum()
    }

    fn min_in_flight_tick(&self) -> Option<Tick> {
        self.min_in_flight
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codefang_core::types::Hash;

    #[derive(Default, Serialize, serde::Deserialize)]
    struct LineCount(u64);

    struct CountLogic;

    impl AggregatorLogic for CountLogic {
        type State = LineCount;

        fn extract(&self, state: &mut LineCount, _tc: &TickCapsule<Box<dyn Payload>>) {
            state.0 += 1;
        }

        fn combine(&self, state: &mut LineCount, other: LineCount) {
            state.0 += other.0;
        }

        fn finalize_tick(&self, _tick: Tick, state: LineCount) -> Box<dyn Payload> {
            #[derive(Debug, Clone)]
            struct CountPayload(u64);
            impl Payload for CountPayload {
                fn is_empty(&self) -> bool {
                    self.0 == 0
                }
                fn as_any(&self) -> &dyn std::any::Any {
                    self
                }
                fn clone_box(&self) -> Box<dyn Payload> {
                    Box::new(self.clone())
                }
                fn to_json(&self) -> serde_json::Value {
                    serde_json::json!(self.0)
                }
            }
            Box::new(CountPayload(state.0))
        }

        fn estimated_bytes(&self, _state: &LineCount) -> usize {
            8
        }
    }

    fn tc(tick: i64) -> TickCapsule<Box<dyn Payload>> {
        TickCapsule {
            commit_hash: Hash::ZERO,
            tick: Tick(tick),
            timestamp: 0,
            data: Box::new(codefang_core::analyzer::EmptyPayload),
        }
    }

    #[test]
    fn extracts_and_finalizes_in_ascending_tick_order() {
        let dir = tempfile::tempdir().unwrap();
        let opts = AggregatorOptions {
            byte_budget: 1 << 20,
            spill_dir: dir.path().to_path_buf(),
        };
        let mut agg = GenericAggregator::new(CountLogic, opts);
        agg.extract_tc(&tc(3));
        agg.extract_tc(&tc(1));
        agg.extract_tc(&tc(1));
        let finalized = agg.finalize();
        assert_eq!(finalized.len(), 2);
        assert_eq!(finalized[0].tick, Tick(1));
        assert_eq!(finalized[1].tick, Tick(3));
    }

    #[test]
    fn spills_and_recovers_under_a_tiny_budget() {
        let dir = tempfile::tempdir().unwrap();
        let opts = AggregatorOptions {
            byte_budget: 1,
            spill_dir: dir.path().to_path_buf(),
        };
        let mut agg = GenericAggregator::new(CountLogic, opts);
        for tick in 0..5 {
            agg.extract_tc(&tc(tick));
        }
        let finalized = agg.finalize();
        assert_eq!(finalized.len(), 5);
    }
}
