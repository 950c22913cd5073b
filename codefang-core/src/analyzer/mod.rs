//! The analyzer contract (spec §4.2). Every plumbing and leaf analyzer
//! implements `Analyzer`; the two sub-kinds differ only in whether other
//! analyzers declare them as a dependency (`AnalyzerDescriptor::mode` and
//! the DAG's dependency graph, not a separate trait, capture that).

pub mod aggregator;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod payload;

pub use aggregator::{Aggregator, AggregatorOptions};
pub use config::{ConfigOption, ConfigOptionType, ConfigValue, Fact};
pub use context::{ConsumeContext, PlumbingSnapshot, RepositoryHandle};
pub use descriptor::{AnalyzerDescriptor, AnalyzerMode};
pub use payload::{EmptyPayload, Payload};

use std::any::Any;

use crate::errors::{AnalyzerError, ConfigurationError};
use crate::types::TickCapsule;

/// Capability/cost hints used by the coordinator's scheduling heuristic
/// (additive per SPEC_FULL §4 — does not change any named operation).
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsHint {
    pub cpu_heavy: bool,
    pub needs_uast: bool,
}

/// The stable abstraction for core (plumbing) and leaf analyzers.
pub trait Analyzer: Send {
    fn descriptor(&self) -> AnalyzerDescriptor;

    fn list_configuration_options(&self) -> Vec<ConfigOption> {
        Vec::new()
    }

    /// Applies configuration and facts. Must be idempotent under the
    /// same facts map (spec §4.2).
    fn configure(&mut self, facts: &[Fact]) -> Result<(), ConfigurationError> {
        let _ = facts;
        Ok(())
    }

    /// One-time per run; allocates long-lived state.
    fn initialize(&mut self, repo: &dyn RepositoryHandle) -> Result<(), ConfigurationError> {
        let _ = repo;
        Ok(())
    }

    /// Leaf-only: capture the outputs of the plumbing analyzers this
    /// leaf depends on, for one commit. Plumbing analyzers return `None`.
    fn snapshot_plumbing(&self) -> Option<PlumbingSnapshot> {
        None
    }

    fn apply_snapshot(&mut self, _snapshot: &PlumbingSnapshot) {}

    fn release_snapshot(&mut self, _snapshot: PlumbingSnapshot) {}

    /// Runs one commit, returning a TC or a per-commit `AnalyzerError`.
    fn consume(
        &mut self,
        ctx: &ConsumeContext,
    ) -> Result<TickCapsule<Box<dyn Payload>>, AnalyzerError>;

    /// Produces `n` independent replicas. Mutable state is deep-copied;
    /// immutable config is shared.
    fn fork(&self, n: usize) -> Vec<Box<dyn Analyzer>>;

    /// Folds `branches` back into `self`. Must be associative and
    /// commutative with respect to the set of commits consumed; ties
    /// are broken by delivering branches in worker-id order.
    fn merge(&mut self, branches: Vec<Box<dyn Analyzer>>);

    /// Produces this analyzer's aggregator, or `None` for plumbing
    /// analyzers (which have no user-visible report).
    fn new_aggregator(&self, opts: &AggregatorOptions) -> Option<Box<dyn Aggregator>> {
        let _ = opts;
        None
    }

    /// Cumulative in-memory growth, for budget estimation.
    fn working_state_size(&self) -> usize;

    /// Per-commit capsule size, for budget estimation.
    fn avg_tc_size(&self) -> usize;

    fn needs_uast(&self) -> bool {
        false
    }

    fn cpu_heavy(&self) -> bool {
        false
    }

    fn metrics_hint(&self) -> MetricsHint {
        MetricsHint {
            cpu_heavy: self.cpu_heavy(),
            needs_uast: self.needs_uast(),
        }
    }

    /// Linear proxy for per-commit footprint growth, used by the chunk
    /// planner (spec §4.9). Defaults to `avg_tc_size()`.
    fn state_growth_per_commit(&self) -> usize {
        self.avg_tc_size()
    }

    /// Releases transient resources between chunks while preserving
    /// cumulative state (spec §4.9). No-op for analyzers with nothing
    /// worth releasing — only `working_state_size()`-heavy analyzers
    /// (e.g. ones caching parsed ASTs) need to override this.
    fn hibernate(&mut self) {}

    /// Restores whatever `hibernate()` released, before the next chunk.
    fn boot(&mut self) {}

    /// True when this analyzer meaningfully implements `hibernate`/`boot`;
    /// lets the coordinator skip the call entirely for analyzers that
    /// don't, rather than paying a no-op virtual call per chunk.
    fn supports_hibernation(&self) -> bool {
        false
    }

    /// Serializes cumulative state at a chunk boundary for checkpointing
    /// (spec §4.10). The byte encoding is analyzer-defined; the default
    /// produces an empty blob, meaning "nothing to persist".
    fn save_state(&self) -> Result<Vec<u8>, crate::errors::CodefangError> {
        Ok(Vec::new())
    }

    /// Restores state previously produced by `save_state`.
    fn load_state(&mut self, bytes: &[u8]) -> Result<(), crate::errors::CodefangError> {
        let _ = bytes;
        Ok(())
    }

    /// True when `save_state`/`load_state` round-trip meaningful state;
    /// the checkpoint manager skips analyzers that don't.
    fn supports_checkpoint(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
