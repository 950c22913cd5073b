//! Per-analyzer `Report` (spec §4.11, §6.2): the finalized TICK list
//! converted into a section the caller can render, diff, or archive.
//! Every leaf's aggregator output funnels through `Report::from_ticks`;
//! the payload itself is only ever touched through `Payload::to_json`,
//! so this crate never needs to know a single concrete analyzer type.

use codefang_core::analyzer::{AnalyzerMode, Payload};
use codefang_core::types::TickAggregate;
use serde::{Deserialize, Serialize};

use crate::errors::ReportError;

/// One finalized tick's worth of report data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportTick {
    pub tick: i64,
    pub start_time: i64,
    pub end_time: i64,
    /// Set when the coordinator's cancel signal cut this tick's input
    /// short (spec §5, Cancellation & timeouts).
    pub truncated: bool,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReportMeta {
    /// True if any tick in this report was truncated by cancellation.
    pub truncated: bool,
    pub tick_count: usize,
}

/// The final per-analyzer artifact (spec §4.11): a named time series
/// plus metadata, serializable losslessly to JSON, YAML, a
/// length-prefixed binary envelope, and an NDJSON stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub analyzer_id: String,
    pub mode: AnalyzerMode,
    pub time_series: Vec<ReportTick>,
    pub meta: ReportMeta,
}

impl Report {
    /// Builds a `Report` from one leaf's finalized TICK list
    /// (`Aggregator::finalize`'s return value).
    pub fn from_ticks(
        analyzer_id: impl Into<String>,
        mode: AnalyzerMode,
        ticks: Vec<TickAggregate<Box<dyn Payload>>>,
    ) -> Report {
        let mut truncated = false;
        let time_series: Vec<ReportTick> = ticks
            .into_iter()
            .map(|t| {
                truncated |= t.truncated;
                ReportTick {
                    tick: t.tick.0,
                    start_time: t.start_time,
                    end_time: t.end_time,
                    truncated: t.truncated,
                    data: t.data.to_json(),
                }
            })
            .collect();

        Report {
            analyzer_id: analyzer_id.into(),
            mode,
            meta: ReportMeta {
                truncated,
                tick_count: time_series.len(),
            },
            time_series,
        }
    }

    /// Canonical, human-readable form (spec §4.11, golden-test reference).
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

    /// Lossless with respect to JSON (spec §4.11): same shape, different
    /// syntax, never a reduced representation.
    pub fn to_yaml(&self) -> Result<String, ReportError> {
        serde_yaml::to_string(self).map_err(|e| ReportError::Serialize {
            format: "yaml",
            cause: e.to_string(),
        })
    }

    pub fn from_yaml(s: &str) -> Result<Self, ReportError> {
        serde_yaml::from_str(s).map_err(|e| ReportError::Deserialize {
            format: "yaml",
            cause: e.to_string(),
        })
    }

    /// Length-prefixed binary envelope (spec §4.11): a 4-byte
    /// little-endian length header followed by the canonical JSON
    /// encoding. The envelope exists to let callers frame reports inside
    /// a byte stream (e.g. one report per checkpoint segment) without a
    /// separate binary codec to keep in sync with `Report`'s fields.
    pub fn to_binary_envelope(&self) -> Result<Vec<u8>, ReportError> {
        let json = serde_json::to_vec(self).map_err(|e| ReportError::Serialize {
            format: "binary",
            cause: e.to_string(),
        })?;
        let mut out = Vec::with_capacity(4 + json.len());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(&json);
        Ok(out)
    }

    pub fn from_binary_envelope(bytes: &[u8]) -> Result<Self, ReportError> {
        if bytes.len() < 4 {
            return Err(ReportError::MalformedEnvelope {
                reason: "envelope shorter than the 4-byte length header".to_string(),
            });
        }
        let (header, rest) = bytes.split_at(4);
        let len = u32::from_le_bytes(header.try_into().unwrap()) as usize;
        if rest.len() != len {
            return Err(ReportError::MalformedEnvelope {
                reason: format!("header declares {len} bytes, body has {}", rest.len()),
            });
        }
        serde_json::from_slice(rest).map_err(|e| ReportError::Deserialize {
            format: "binary",
            cause: e.to_string(),
        })
    }

    /// One JSON line per tick, finalization metadata suppressed (spec
    /// §4.11): the streaming-timeseries form, meant to be appended to as
    /// ticks complete rather than written once at the end.
    pub fn to_ndjson(&self) -> Result<String, ReportError> {
        let mut out = String::new();
        for tick in &self.time_series {
            let line = serde_json::to_string(tick).map_err(|e| ReportError::Serialize {
                format: "ndjson",
                cause: e.to_string(),
            })?;
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codefang_core::types::Tick;

    fn sample_report() -> Report {
        let ticks = vec![
            TickAggregate {
                tick: Tick(1),
                start_time: 10,
                end_time: 20,
                data: Box::new(codefang_core::analyzer::EmptyPayload) as Box<dyn Payload>,
                truncated: false,
            },
            TickAggregate {
                tick: Tick(2),
                start_time: 20,
                end_time: 30,
                data: Box::new(codefang_core::analyzer::EmptyPayload) as Box<dyn Payload>,
                truncated: true,
            },
        ];
        Report::from_ticks("burndown", AnalyzerMode::History, ticks)
    }

    #[test]
    fn from_ticks_tracks_truncation_and_count() {
        let report = sample_report();
        assert_eq!(report.meta.tick_count, 2);
        assert!(report.meta.truncated);
        assert!(!report.time_series[0].truncated);
        assert!(report.time_series[1].truncated);
    }

    #[test]
    fn json_round_trips() {
        let report = sample_report();
        let json = report.to_json().unwrap();
        let back = Report::from_json(&json).unwrap();
        assert_eq!(report, back);
    }

    #[test]
    fn yaml_round_trips_losslessly_with_json() {
        let report = sample_report();
        let yaml = report.to_yaml().unwrap();
        let back = Report::from_yaml(&yaml).unwrap();
        assert_eq!(report, back);
    }

    #[test]
    fn binary_envelope_round_trips() {
        let report = sample_report();
        let bytes = report.to_binary_envelope().unwrap();
        let back = Report::from_binary_envelope(&bytes).unwrap();
        assert_eq!(report, back);
    }

    #[test]
    fn binary_envelope_rejects_truncated_bytes() {
        let report = sample_report();
        let mut bytes = report.to_binary_envelope().unwrap();
        bytes.truncate(bytes.len() - 1);
        assert!(Report::from_binary_envelope(&bytes).is_err());
    }

    #[test]
    fn ndjson_emits_one_line_per_tick() {
        let report = sample_report();
        let ndjson = report.to_ndjson().unwrap();
        assert_eq!(ndjson.lines().count(), 2);
        for line in ndjson.lines() {
            serde_json::from_str::<serde_json::Value>(line).unwrap();
        }
    }

    #[test]
    fn empty_ticks_produce_an_empty_time_series() {
        let report = Report::from_ticks("noop", AnalyzerMode::Static, Vec::new());
        assert!(report.time_series.is_empty());
        assert!(!report.meta.truncated);
    }
}
