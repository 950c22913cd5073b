//! Stable, machine-readable error codes attached to every error variant.
//!
//! Mirrors the teacher's `DriftErrorCode` pattern: each error enum
//! implements this trait so callers (process wrappers, telemetry) can
//! switch on a code instead of matching the full `Display` string.

/// Returns a stable, upper-snake-case identifier for an error variant.
pub trait CodefangErrorCode {
    fn error_code(&self) -> &'static str;
}

pub const CONFIG_INVALID_BUDGET: &str = "CONFIG_INVALID_BUDGET";
pub const CONFIG_UNKNOWN_SUFFIX: &str = "CONFIG_UNKNOWN_SUFFIX";
pub const CONFIG_UNKNOWN_ANALYZER: &str = "CONFIG_UNKNOWN_ANALYZER";
pub const CONFIG_MISSING_DEPENDENCY: &str = "CONFIG_MISSING_DEPENDENCY";
pub const CONFIG_UNKNOWN_FACT: &str = "CONFIG_UNKNOWN_FACT";

pub const REPO_OPEN_FAILED: &str = "REPO_OPEN_FAILED";
pub const REPO_READ_FAILED: &str = "REPO_READ_FAILED";

pub const BUDGET_TOO_SMALL: &str = "BUDGET_TOO_SMALL";

pub const ANALYZER_ERROR: &str = "ANALYZER_ERROR";
pub const AGGREGATOR_ERROR: &str = "AGGREGATOR_ERROR";

pub const CHECKPOINT_INVALID: &str = "CHECKPOINT_INVALID";
pub const CHECKPOINT_IO_ERROR: &str = "CHECKPOINT_IO_ERROR";

pub const CANCELLED: &str = "CANCELLED";
pub const FATAL_ERROR: &str = "FATAL_ERROR";
