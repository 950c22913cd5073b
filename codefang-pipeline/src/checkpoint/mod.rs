//! Checkpoint manager (spec §4.10): persists every checkpointable
//! analyzer's state at a chunk boundary, and restores it on resume.
//!
//! Layout under the configured checkpoint directory:
//!   manifest.json        — run identity, last completed tick, analyzer ids
//!   <analyzer_id>.state   — that analyzer's `save_state()` bytes, with a
//!                           trailing 4-byte little-endian crc32 footer
//!
//! Writes go through a temp file + rename so a crash mid-write never
//! leaves a corrupt checkpoint in place; `tempfile::NamedTempFile` is
//! already in the teacher's dependency set (exercised in
//! `drift_core::telemetry::collector`'s tests), generalized here from
//! test scaffolding to a production atomic-write primitive.

use std::fs;
use std::path::{Path, PathBuf};

use codefang_core::errors::CodefangError;
use codefang_core::types::Tick;
use codefang_core::Analyzer;
use serde::{Deserialize, Serialize};

/// Bumped whenever the on-disk manifest shape changes incompatibly; a
/// mismatch on load is a descriptor mismatch, same as a different repo.
pub const SCHEMA_VERSION: u32 = 1;

/// Chunk-granularity progress recorded alongside each checkpoint save and
/// restored on resume, so the coordinator can skip chunks it already fed
/// to the (restored) analyzer state instead of double-counting them.
#[derive(Debug, Clone, Copy)]
pub struct RunProgress {
    pub current_chunk: usize,
    pub total_chunks: usize,
    pub processed_commits: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub run_id: String,
    pub repo_hash: String,
    pub schema_version: u32,
    pub last_completed_tick: Option<i64>,
    pub analyzer_ids: Vec<String>,
    pub current_chunk: usize,
    pub total_chunks: usize,
    pub processed_commits: usize,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CheckpointManager { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn state_path(&self, analyzer_id: &str) -> PathBuf {
        self.dir.join(format!("{analyzer_id}.state"))
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join("manifest.json")
    }

    /// Saves every analyzer that opts into checkpointing, plus a
    /// manifest recording the run descriptor (§4.10: repo hash, schema
    /// version, which ids were written) and the streaming progress
    /// (`progress`) needed to resume without re-feeding commits already
    /// reflected in the saved state. Returns `Ok(())` even if no
    /// analyzer had anything to save.
    pub fn save(
        &self,
        run_id: &str,
        repo_hash: &str,
        last_completed_tick: Option<Tick>,
        analyzers: &[Box<dyn Analyzer>],
        progress: RunProgress,
    ) -> Result<(), CodefangError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| CodefangError::CheckpointIo(e.to_string()))?;

        let mut saved_ids = Vec::new();
        for analyzer in analyzers {
            if !analyzer.supports_checkpoint() {
                continue;
            }
            let id = analyzer.descriptor().id;
            let bytes = analyzer.save_state()?;
            self.write_atomic(&self.state_path(&id), &with_checksum(&bytes))?;
            saved_ids.push(id);
        }

        let manifest = Manifest {
            run_id: run_id.to_string(),
            repo_hash: repo_hash.to_string(),
            schema_version: SCHEMA_VERSION,
            last_completed_tick: last_completed_tick.map(|t| t.0),
            analyzer_ids: saved_ids,
            current_chunk: progress.current_chunk,
            total_chunks: progress.total_chunks,
            processed_commits: progress.processed_commits,
        };
        let json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| CodefangError::CheckpointIo(e.to_string()))?;
        self.write_atomic(&self.manifest_path(), &json)?;
        Ok(())
    }

    /// Loads the manifest and restores every analyzer it names. Analyzers
    /// not present in the manifest are left at their fresh-start state.
    ///
    /// Validates the run descriptor first (spec §4.10: same repo hash,
    /// same schema version, same checkpointed analyzer selection);
    /// a mismatch is reported as `CheckpointInvalid` without touching
    /// any analyzer state, so the caller can fall back to a fresh run.
    /// A checksum mismatch on any state file is reported the same way.
    pub fn load(
        &self,
        repo_hash: &str,
        analyzers: &mut [Box<dyn Analyzer>],
    ) -> Result<Option<Manifest>, CodefangError> {
        let manifest_path = self.manifest_path();
        if !manifest_path.exists() {
            return Ok(None);
        }
        let raw = fs::read(&manifest_path).map_err(|e| CodefangError::CheckpointIo(e.to_string()))?;
        let manifest: Manifest =
            serde_json::from_slice(&raw).map_err(|_| CodefangError::CheckpointInvalid {
                reason: "manifest.json is not valid JSON".to_string(),
            })?;

        if manifest.schema_version != SCHEMA_VERSION {
            return Err(CodefangError::CheckpointInvalid {
                reason: format!(
                    "checkpoint schema version {} does not match current version {SCHEMA_VERSION}",
                    manifest.schema_version
                ),
            });
        }
        if manifest.repo_hash != repo_hash {
            return Err(CodefangError::CheckpointInvalid {
                reason: "checkpoint was recorded against a different repository".to_string(),
            });
        }
        let checkpointable_ids: Vec<String> = analyzers
            .iter()
            .filter(|a| a.supports_checkpoint())
            .map(|a| a.descriptor().id)
            .collect();
        if manifest.analyzer_ids != checkpointable_ids {
            return Err(CodefangError::CheckpointInvalid {
                reason: "checkpoint was recorded for a different analyzer selection".to_string(),
            });
        }

        for analyzer in analyzers.iter_mut() {
            let id = analyzer.descriptor().id;
            if !manifest.analyzer_ids.contains(&id) {
                continue;
            }
            let path = self.state_path(&id);
            let raw = fs::read(&path).map_err(|e| CodefangError::CheckpointIo(e.to_string()))?;
            let payload = verify_checksum(&raw, &id)?;
            analyzer.load_state(payload)?;
        }

        Ok(Some(manifest))
    }

    pub fn clear(&self) -> Result<(), CodefangError> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)
                .map_err(|e| CodefangError::CheckpointIo(e.to_string()))?;
        }
        Ok(())
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), CodefangError> {
        let dir = path.parent().unwrap_or(&self.dir);
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| CodefangError::CheckpointIo(e.to_string()))?;
        use std::io::Write;
        tmp.write_all(bytes)
            .map_err(|e| CodefangError::CheckpointIo(e.to_string()))?;
        tmp.persist(path)
            .map_err(|e| CodefangError::CheckpointIo(e.to_string()))?;
        Ok(())
    }
}

fn with_checksum(bytes: &[u8]) -> Vec<u8> {
    let checksum = crc32fast::hash(bytes);
    let mut out = Vec::with_capacity(bytes.len() + 4);
    out.extend_from_slice(bytes);
    out.extend_from_slice(&checksum.to_le_bytes());
    out
}

fn verify_checksum<'a>(raw: &'a [u8], analyzer_id: &str) -> Result<&'a [u8], CodefangError> {
    if raw.len() < 4 {
        return Err(CodefangError::CheckpointInvalid {
            reason: format!("{analyzer_id}.state is too short to contain a checksum"),
        });
    }
    let (payload, footer) = raw.split_at(raw.len() - 4);
    let expected = u32::from_le_bytes(footer.try_into().unwrap());
    let actual = crc32fast::hash(payload);
    if actual != expected {
        return Err(CodefangError::CheckpointInvalid {
            reason: format!("{analyzer_id}.state checksum mismatch (corrupt checkpoint)"),
        });
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codefang_core::analyzer::{AnalyzerDescriptor, AnalyzerMode, ConsumeContext, Payload};
    use codefang_core::errors::AnalyzerError;
    use codefang_core::types::TickCapsule;
    use std::any::Any;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct CounterAnalyzer {
        count: Mutex<u64>,
    }

    impl Analyzer for CounterAnalyzer {
        fn descriptor(&self) -> AnalyzerDescriptor {
            AnalyzerDescriptor {
                id: "counter".to_string(),
                description: String::new(),
                mode: AnalyzerMode::History,
            }
        }

        fn consume(
            &mut self,
            ctx: &ConsumeContext,
        ) -> Result<TickCapsule<Box<dyn Payload>>, AnalyzerError> {
            Ok(TickCapsule {
                commit_hash: ctx.commit_hash,
                tick: ctx.tick,
                timestamp: ctx.timestamp,
                data: Box::new(codefang_core::analyzer::EmptyPayload),
            })
        }

        fn fork(&self, n: usize) -> Vec<Box<dyn Analyzer>> {
            (0..n)
                .map(|_| {
                    Box::new(CounterAnalyzer {
                        count: Mutex::new(*self.count.lock().unwrap()),
                    }) as Box<dyn Analyzer>
                })
                .collect()
        }

        fn merge(&mut self, _branches: Vec<Box<dyn Analyzer>>) {}

        fn working_state_size(&self) -> usize {
            8
        }

        fn avg_tc_size(&self) -> usize {
            8
        }

        fn save_state(&self) -> Result<Vec<u8>, CodefangError> {
            Ok(self.count.lock().unwrap().to_le_bytes().to_vec())
        }

        fn load_state(&mut self, bytes: &[u8]) -> Result<(), CodefangError> {
            let arr: [u8; 8] = bytes
                .try_into()
                .map_err(|_| CodefangError::CheckpointInvalid {
                    reason: "expected 8 bytes".to_string(),
                })?;
            *self.count.lock().unwrap() = u64::from_le_bytes(arr);
            Ok(())
        }

        fn supports_checkpoint(&self) -> bool {
            true
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());

        let analyzer = CounterAnalyzer {
            count: Mutex::new(42),
        };
        let analyzers: Vec<Box<dyn Analyzer>> = vec![Box::new(analyzer)];
        let progress = RunProgress {
            current_chunk: 2,
            total_chunks: 5,
            processed_commits: 300,
        };
        manager
            .save("run-1", "repo-abc", Some(Tick(5)), &analyzers, progress)
            .unwrap();

        let mut restored: Vec<Box<dyn Analyzer>> = vec![Box::new(CounterAnalyzer {
            count: Mutex::new(0),
        })];
        let manifest = manager.load("repo-abc", &mut restored).unwrap().unwrap();
        assert_eq!(manifest.run_id, "run-1");
        assert_eq!(manifest.last_completed_tick, Some(5));
        assert_eq!(manifest.current_chunk, 2);
        assert_eq!(manifest.total_chunks, 5);
        assert_eq!(manifest.processed_commits, 300);

        let restored_counter = restored[0].as_any().downcast_ref::<CounterAnalyzer>().unwrap();
        assert_eq!(*restored_counter.count.lock().unwrap(), 42);
    }

    #[test]
    fn corrupted_state_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        let analyzers: Vec<Box<dyn Analyzer>> = vec![Box::new(CounterAnalyzer {
            count: Mutex::new(1),
        })];
        let progress = RunProgress {
            current_chunk: 0,
            total_chunks: 1,
            processed_commits: 10,
        };
        manager
            .save("run-1", "repo-abc", None, &analyzers, progress)
            .unwrap();

        let state_path = dir.path().join("counter.state");
        let mut bytes = fs::read(&state_path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&state_path, bytes).unwrap();

        let mut restored: Vec<Box<dyn Analyzer>> = vec![Box::new(CounterAnalyzer {
            count: Mutex::new(0),
        })];
        let err = manager.load("repo-abc", &mut restored).unwrap_err();
        assert!(matches!(err, CodefangError::CheckpointInvalid { .. }));
    }

    #[test]
    fn mismatched_repo_hash_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        let analyzers: Vec<Box<dyn Analyzer>> = vec![Box::new(CounterAnalyzer {
            count: Mutex::new(1),
        })];
        let progress = RunProgress {
            current_chunk: 0,
            total_chunks: 1,
            processed_commits: 10,
        };
        manager
            .save("run-1", "repo-abc", None, &analyzers, progress)
            .unwrap();

        let mut restored: Vec<Box<dyn Analyzer>> = vec![Box::new(CounterAnalyzer {
            count: Mutex::new(0),
        })];
        let err = manager.load("repo-xyz", &mut restored).unwrap_err();
        assert!(matches!(err, CodefangError::CheckpointInvalid { .. }));
    }

    #[test]
    fn missing_manifest_reports_no_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        let mut analyzers: Vec<Box<dyn Analyzer>> = Vec::new();
        assert!(manager.load("repo-abc", &mut analyzers).unwrap().is_none());
    }
}
