//! Per-commit context handed to `Analyzer::consume` (spec §4.2, §4.3).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::types::{AuthorId, Change, FxHashMap, Hash, Tick};

use super::payload::Payload;

/// A snapshot of one plumbing analyzer's output for a single commit,
/// captured by `snapshot_plumbing()` so leaves can be driven
/// deterministically even after the plumbing stage has hibernated or
/// been freed (spec §4.2).
#[derive(Clone)]
pub struct PlumbingSnapshot {
    pub analyzer_id: String,
    pub tick: Tick,
    pub data: Box<dyn Payload>,
}

/// Minimal, object-safe facade over the `Repository` collaborator that
/// `Analyzer::initialize` can use without the `Analyzer` trait itself
/// becoming generic over a concrete backend.
pub trait RepositoryHandle: Send + Sync {
    fn head(&self) -> Hash;
    fn repo_identifier(&self) -> &str;
}

/// Everything `consume()` needs to process one commit: identity of the
/// commit, its tick and author, the changes it introduced, and the
/// outputs of whichever plumbing analyzers this analyzer depends on.
pub struct ConsumeContext {
    pub commit_hash: Hash,
    pub tick: Tick,
    pub author_id: AuthorId,
    pub timestamp: i64,
    pub changes: Arc<[Change]>,
    plumbing_outputs: FxHashMap<String, Box<dyn Payload>>,
    cancelled: Arc<AtomicBool>,
}

impl ConsumeContext {
    pub fn new(
        commit_hash: Hash,
        tick: Tick,
        author_id: AuthorId,
        timestamp: i64,
        changes: Arc<[Change]>,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        ConsumeContext {
            commit_hash,
            tick,
            author_id,
            timestamp,
            changes,
            plumbing_outputs: FxHashMap::default(),
            cancelled,
        }
    }

    pub fn install_plumbing_output(&mut self, analyzer_id: &str, data: Box<dyn Payload>) {
        self.plumbing_outputs.insert(analyzer_id.to_string(), data);
    }

    pub fn plumbing_output(&self, analyzer_id: &str) -> Option<&dyn Payload> {
        self.plumbing_outputs.get(analyzer_id).map(|b| b.as_ref())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
