//! Error taxonomy (spec §7).
//!
//! Every fallible core operation returns one of these variants. Per-commit
//! `AnalyzerError`s are recoverable inside a lane (log and emit an empty
//! TC); everything else bubbles to the coordinator.

pub mod error_code;

pub use error_code::CodefangErrorCode;

use crate::types::Hash;

/// Top-level error type surfaced by the coordinator and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum CodefangError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("memory budget too small: {reason}")]
    BudgetTooSmall { reason: String },

    #[error("analyzer {analyzer_id} failed on commit {commit_hash}: {cause}")]
    Analyzer {
        analyzer_id: String,
        commit_hash: Hash,
        cause: String,
    },

    #[error("aggregator error: {0}")]
    Aggregator(#[from] AggregatorError),

    #[error("checkpoint invalid: {reason}")]
    CheckpointInvalid { reason: String },

    #[error("checkpoint I/O error: {0}")]
    CheckpointIo(String),

    #[error("run cancelled")]
    Cancelled,

    #[error("fatal error: {0}")]
    Fatal(String),
}

impl CodefangErrorCode for CodefangError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(e) => e.error_code(),
            Self::Repository(e) => e.error_code(),
            Self::BudgetTooSmall { .. } => error_code::BUDGET_TOO_SMALL,
            Self::Analyzer { .. } => error_code::ANALYZER_ERROR,
            Self::Aggregator(e) => e.error_code(),
            Self::CheckpointInvalid { .. } => error_code::CHECKPOINT_INVALID,
            Self::CheckpointIo(_) => error_code::CHECKPOINT_IO_ERROR,
            Self::Cancelled => error_code::CANCELLED,
            Self::Fatal(_) => error_code::FATAL_ERROR,
        }
    }
}

/// Errors raised while validating or applying pipeline configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("invalid memory budget: {reason}")]
    InvalidBudget { reason: String },

    #[error("unknown size suffix in {value:?}")]
    UnknownSizeSuffix { value: String },

    #[error("unknown analyzer id: {id}")]
    UnknownAnalyzer { id: String },

    #[error("analyzer {analyzer_id} declares missing plumbing dependency {dependency_id}")]
    MissingDependency {
        analyzer_id: String,
        dependency_id: String,
    },

    #[error("analyzer {analyzer_id} rejected unknown fact {fact_name}")]
    UnknownFact {
        analyzer_id: String,
        fact_name: String,
    },
}

impl CodefangErrorCode for ConfigurationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidBudget { .. } => error_code::CONFIG_INVALID_BUDGET,
            Self::UnknownSizeSuffix { .. } => error_code::CONFIG_UNKNOWN_SUFFIX,
            Self::UnknownAnalyzer { .. } => error_code::CONFIG_UNKNOWN_ANALYZER,
            Self::MissingDependency { .. } => error_code::CONFIG_MISSING_DEPENDENCY,
            Self::UnknownFact { .. } => error_code::CONFIG_UNKNOWN_FACT,
        }
    }
}

/// Errors surfaced by the `Repository`/`CommitIterator` collaborator.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("cannot open repository at {path}: {cause}")]
    OpenFailed { path: String, cause: String },

    #[error("cannot read {what} {hash}: {cause}")]
    ReadFailed {
        what: &'static str,
        hash: Hash,
        cause: String,
    },
}

impl CodefangErrorCode for RepositoryError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::OpenFailed { .. } => error_code::REPO_OPEN_FAILED,
            Self::ReadFailed { .. } => error_code::REPO_READ_FAILED,
        }
    }
}

/// Aggregator-side errors. Spill I/O failures are always fatal (spec §7).
#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("failed to spill tick {tick} to disk: {cause}")]
    SpillFailed { tick: i64, cause: String },

    #[error("failed to read back spilled tick {tick}: {cause}")]
    SpillReadFailed { tick: i64, cause: String },
}

impl CodefangErrorCode for AggregatorError {
    fn error_code(&self) -> &'static str {
        error_code::AGGREGATOR_ERROR
    }
}

/// Per-commit analyzer failure. Carries enough context for the coordinator
/// to log-and-continue (default policy) or escalate if marked fatal.
#[derive(Debug, thiserror::Error)]
#[error("analyzer {analyzer_id} failed on commit {commit_hash}: {cause}")]
pub struct AnalyzerError {
    pub analyzer_id: String,
    pub commit_hash: Hash,
    pub cause: String,
    /// When true, the coordinator aborts the run instead of skipping the commit.
    pub fatal: bool,
}

impl CodefangErrorCode for AnalyzerError {
    fn error_code(&self) -> &'static str {
        if self.fatal {
            error_code::FATAL_ERROR
        } else {
            error_code::ANALYZER_ERROR
        }
    }
}
