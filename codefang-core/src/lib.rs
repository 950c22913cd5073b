//! # codefang-core
//!
//! Foundation crate for the Codefang analysis pipeline: identities, the
//! analyzer contract, the error taxonomy, typed configuration, the
//! external collaborator interfaces (`Repository`/`UastParser`), and the
//! observability hooks every other crate in the workspace builds on.

#![allow(dead_code)]

pub mod analyzer;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod repository;
pub mod types;

pub use analyzer::{Analyzer, AnalyzerDescriptor, AnalyzerMode};
pub use config::PipelineConfig;
pub use errors::{CodefangError, CodefangErrorCode};
pub use metrics::Metrics;
pub use types::{AuthorId, Change, ChangeAction, Hash, Tick, TickAggregate, TickCapsule};
