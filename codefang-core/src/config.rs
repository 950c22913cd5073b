//! Typed configuration surface (spec §6.3), mirroring
//! `drift_core::config::ScanConfig`'s `Option<T>` + `effective_*()`
//! accessor convention so unset fields fall back to documented defaults
//! without the core ever parsing CLI flags or files itself.

use serde::{Deserialize, Serialize};

/// Streaming mode selection (spec §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StreamingMode {
    #[default]
    Auto,
    On,
    Off,
}

/// Master configuration consumed by `Run()` (spec §2, §6.3). Constructed
/// by the caller; this crate never parses it from argv or a file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub workers: Option<usize>,
    pub buffer_size: Option<usize>,
    pub commit_batch_size: Option<usize>,
    pub blob_cache_size: Option<u64>,
    pub diff_cache_size: Option<usize>,
    pub blob_arena_size: Option<u64>,
    pub memory_budget: Option<u64>,
    pub first_parent: Option<bool>,
    pub head_only: Option<bool>,
    pub since: Option<i64>,
    pub limit: Option<usize>,
    pub streaming_mode: Option<StreamingMode>,
    pub checkpoint: CheckpointConfig,
}

impl PipelineConfig {
    pub fn effective_buffer_size(&self) -> usize {
        self.buffer_size
            .filter(|&v| v != 0)
            .unwrap_or_else(|| 2 * self.effective_workers())
    }

    pub fn effective_workers(&self) -> usize {
        match self.workers {
            Some(0) | None => num_cpus::get(),
            Some(w) => w,
        }
    }

    pub fn effective_commit_batch_size(&self) -> usize {
        self.commit_batch_size.filter(|&v| v != 0).unwrap_or(100)
    }

    pub fn effective_blob_cache_size(&self) -> u64 {
        self.blob_cache_size
            .filter(|&v| v != 0)
            .unwrap_or(1 << 30) // 1 GiB default
    }

    pub fn effective_diff_cache_size(&self) -> usize {
        self.diff_cache_size.filter(|&v| v != 0).unwrap_or(10_000)
    }

    pub fn effective_blob_arena_size(&self) -> u64 {
        self.blob_arena_size
            .filter(|&v| v != 0)
            .unwrap_or(4 << 20) // 4 MiB default
    }

    pub fn effective_streaming_mode(&self) -> StreamingMode {
        self.streaming_mode.unwrap_or_default()
    }

    pub fn effective_first_parent(&self) -> bool {
        self.first_parent.unwrap_or(false)
    }
}

/// Checkpoint persistence controls (spec §6.3).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CheckpointConfig {
    pub enabled: Option<bool>,
    pub dir: Option<String>,
    pub resume: Option<bool>,
    pub clear_checkpoint: Option<bool>,
}

impl CheckpointConfig {
    pub fn effective_enabled(&self) -> bool {
        self.enabled.unwrap_or(false)
    }

    pub fn effective_dir(&self) -> String {
        self.dir.clone().unwrap_or_else(|| ".codefang-checkpoint".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.effective_commit_batch_size(), 100);
        assert_eq!(cfg.effective_diff_cache_size(), 10_000);
        assert_eq!(cfg.effective_blob_arena_size(), 4 << 20);
        assert_eq!(cfg.effective_blob_cache_size(), 1 << 30);
        assert_eq!(cfg.effective_buffer_size(), 2 * cfg.effective_workers());
    }

    #[test]
    fn round_trips_through_json() {
        let mut cfg = PipelineConfig::default();
        cfg.workers = Some(4);
        cfg.memory_budget = Some(256 << 20);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.workers, Some(4));
        assert_eq!(back.memory_budget, Some(256 << 20));
    }
}
