//! # codefang-pipeline
//!
//! Scheduling and execution (spec §2 component D/E/F/G): the plumbing
//! DAG, the parallel coordinator that forks/dispatches/merges analyzer
//! lanes per chunk, the streaming/chunking planner, the checkpoint
//! manager, and the generic closure-driven aggregator.

pub mod aggregator;
pub mod cancellation;
pub mod checkpoint;
pub mod coordinator;
pub mod dag;
pub mod streaming;

pub use aggregator::{AggregatorLogic, GenericAggregator};
pub use cancellation::CancellationToken;
pub use checkpoint::{CheckpointManager, Manifest};
pub use coordinator::{collect_commit_units, CommitUnit, CoordinatorOutcome, ParallelCoordinator};
pub use dag::{AnalyzerRegistration, Dag};
pub use streaming::{hibernate_all, boot_all, plan_chunks, ChunkPlan};
