//! Analyzer descriptor (spec §4.2).

/// Whether an analyzer's output depends only on the current commit's
/// tree (`Static`) or on the accumulated history seen so far (`History`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AnalyzerMode {
    Static,
    History,
}

/// Stable, globally-unique identity for an analyzer. `id` is used as a
/// report section key and as a checkpoint discriminator, so it must
/// never change across releases for the same analyzer.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnalyzerDescriptor {
    pub id: String,
    pub description: String,
    pub mode: AnalyzerMode,
}
