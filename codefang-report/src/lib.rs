//! Report assembly and multi-format serialization for the Codefang
//! analysis pipeline (spec §4.11): turns finalized per-analyzer TICK
//! lists into `Report`s, and merges a run's `Report`s into a unified
//! `RunModel`.

pub mod errors;
pub mod report;
pub mod run_model;

pub use errors::ReportError;
pub use report::{Report, ReportMeta, ReportTick};
pub use run_model::{AnalyzerReport, RunModel, RUN_MODEL_VERSION};
