//! Report assembly/serialization errors (spec §7's taxonomy, scoped to
//! this crate's own boundary the way `codefang-core::errors` is scoped
//! to the coordinator's).

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to serialize report to {format}: {cause}")]
    Serialize { format: &'static str, cause: String },

    #[error("failed to deserialize report from {format}: {cause}")]
    Deserialize { format: &'static str, cause: String },

    #[error("binary envelope is malformed: {reason}")]
    MalformedEnvelope { reason: String },
}
