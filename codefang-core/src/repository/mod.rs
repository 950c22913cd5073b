//! External collaborator interfaces (spec §6.1).
//!
//! Git object access, language parsing, and everything else named here
//! is explicitly out of scope for this crate family (spec §1) — these
//! traits exist only to pin the contract the coordinator drives against.

use crate::errors::RepositoryError;
use crate::types::{CachedBlob, Change, Hash};

/// Options controlling which commits `Repository::log` yields.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub first_parent: bool,
    pub since: Option<i64>,
    pub reverse: bool,
}

/// A single commit as exposed by the backend.
pub trait Commit: Send + Sync {
    fn hash(&self) -> Hash;
    fn author(&self) -> &str;
    fn timestamp(&self) -> i64;
    fn parents(&self) -> &[Hash];
    fn tree(&self) -> Hash;
    fn message(&self) -> &str;
}

/// Outcome of advancing a `CommitIterator`.
pub enum CommitIterStep<C: Commit> {
    Commit(C),
    Eof,
}

/// Streams commits in the order the backend decided to yield them (the
/// coordinator is responsible for any further reordering, e.g.
/// first-parent filtering).
pub trait CommitIterator {
    type CommitType: Commit;

    fn next(&mut self) -> Result<CommitIterStep<Self::CommitType>, RepositoryError>;
    fn close(&mut self);
}

/// Native memory limits derived by the budget solver (spec §4.4) and
/// pushed down into the repository backend.
#[derive(Debug, Clone, Copy)]
pub struct NativeMemoryLimits {
    pub mmap_window_bytes: u64,
    pub cache_max_bytes: u64,
    pub malloc_arena_count: u32,
}

/// Git object access capability. Presented as a capability the core
/// depends on but never implements (spec §1, §6.1).
pub trait Repository: Send + Sync {
    type CommitType: Commit;
    type Iter: CommitIterator<CommitType = Self::CommitType>;

    fn open(path: &str) -> Result<Self, RepositoryError>
    where
        Self: Sized;

    fn head(&self) -> Result<Hash, RepositoryError>;
    fn log(&self, options: &LogOptions) -> Result<Self::Iter, RepositoryError>;
    fn lookup_commit(&self, hash: Hash) -> Result<Self::CommitType, RepositoryError>;
    fn commit_count(&self, options: &LogOptions) -> Result<usize, RepositoryError>;

    /// Per-path changes between `from` (`None` for the first commit in
    /// a walk, i.e. diff against the empty tree) and `to`. Tree diffing
    /// itself is the same out-of-scope capability as blob loading —
    /// the coordinator only ever consumes the resulting `Change` list.
    fn diff_trees(&self, from: Option<Hash>, to: Hash) -> Result<Vec<Change>, RepositoryError>;

    /// Loads one blob's bytes, for analyzers that need file content
    /// rather than just the fact that it changed.
    fn read_blob(&self, hash: Hash) -> Result<CachedBlob, RepositoryError>;

    fn free(&mut self);
    fn configure_memory_limits(&mut self, limits: NativeMemoryLimits);
}

/// Opaque parse tree handed back by `UastParser::parse`. The core never
/// inspects its contents; only analyzers that `needs_uast()` do.
pub trait Tree: Send + Sync {}

/// Language-specific source parsing capability (spec §1, §6.1).
pub trait UastParser: Send {
    type TreeType: Tree;

    fn is_supported(&self, file_name: &str) -> bool;
    fn parse(&mut self, file_name: &str, bytes: &[u8]) -> Result<Self::TreeType, RepositoryError>;
    fn get_language(&self, file_name: &str) -> Option<&'static str>;
}
