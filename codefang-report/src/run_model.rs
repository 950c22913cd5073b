//! The unified run model (spec §4.11): merges every leaf's `Report`
//! into one `{version, analyzers: [{id, mode, report}]}` document, the
//! artifact a caller actually persists or serves after a run completes.

use codefang_core::analyzer::AnalyzerMode;
use serde::{Deserialize, Serialize};

use crate::errors::ReportError;
use crate::report::Report;

/// Bumped whenever `RunModel`'s or `Report`'s shape changes in a way
/// that isn't backward compatible for a reader pinned to an older
/// version.
pub const RUN_MODEL_VERSION: &str = "1";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzerReport {
    pub id: String,
    pub mode: AnalyzerMode,
    pub report: Report,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunModel {
    pub version: String,
    pub analyzers: Vec<AnalyzerReport>,
}

impl RunModel {
    /// Assembles every leaf's finalized `Report` into one run model,
    /// sorted by analyzer id for a deterministic document regardless of
    /// the order the coordinator finished each leaf in.
    pub fn assemble(mut reports: Vec<Report>) -> RunModel {
        reports.sort_by(|a, b| a.analyzer_id.cmp(&b.analyzer_id));
        let analyzers = reports
            .into_iter()
            .map(|report| AnalyzerReport {
                id: report.analyzer_id.clone(),
                mode: report.mode,
                report,
            })
            .collect();
        RunModel {
            version: RUN_MODEL_VERSION.to_string(),
            analyzers,
        }
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        serde_json::to_string_pretty(self).map_err(|e| ReportError::Serialize {
            format: "json",
            cause: e.to_string(),
        })
    }

    pub fn from_json(s: &str) -> Result<Self, ReportError> {
        serde_json::from_str(s).map_err(|e| ReportError::Deserialize {
            format: "json",
            cause: e.to_string(),
        })
    }

    pub fn to_yaml(&self) -> Result<String, ReportError> {
        serde_yaml::to_string(self).map_err(|e| ReportError::Serialize {
            format: "yaml",
            cause: e.to_string(),
        })
    }

    pub fn analyzer(&self, id: &str) -> Option<&Report> {
        self.analyzers.iter().find(|a| a.id == id).map(|a| &a.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportMeta;

    fn report(id: &str) -> Report {
        Report {
            analyzer_id: id.to_string(),
            mode: AnalyzerMode::History,
            time_series: Vec::new(),
            meta: ReportMeta::default(),
        }
    }

    #[test]
    fn assemble_sorts_by_analyzer_id() {
        let model = RunModel::assemble(vec![report("typos"), report("burndown"), report("devs")]);
        let ids: Vec<&str> = model.analyzers.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["burndown", "devs", "typos"]);
    }

    #[test]
    fn carries_the_current_version() {
        let model = RunModel::assemble(vec![report("burndown")]);
        assert_eq!(model.version, RUN_MODEL_VERSION);
    }

    #[test]
    fn analyzer_lookup_by_id() {
        let model = RunModel::assemble(vec![report("burndown")]);
        assert!(model.analyzer("burndown").is_some());
        assert!(model.analyzer("missing").is_none());
    }

    #[test]
    fn json_round_trips() {
        let model = RunModel::assemble(vec![report("burndown")]);
        let json = model.to_json().unwrap();
        let back = RunModel::from_json(&json).unwrap();
        assert_eq!(model, back);
    }
}
