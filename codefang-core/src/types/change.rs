//! Per-commit file change records (spec §3.1).

use super::hash::Hash;

/// One side of a change: the path and blob it points at.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChangeEntry {
    pub path: String,
    pub blob_hash: Hash,
}

/// The kind of change a `Change` represents. A rename carries both a
/// `from` and a `to` entry; insert/delete carry only one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ChangeAction {
    Insert,
    Modify,
    Delete,
    Rename,
}

/// A single file change within a commit's diff.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Change {
    pub action: ChangeAction,
    pub from_entry: Option<ChangeEntry>,
    pub to_entry: Option<ChangeEntry>,
}

impl Change {
    pub fn insert(to: ChangeEntry) -> Self {
        Change {
            action: ChangeAction::Insert,
            from_entry: None,
            to_entry: Some(to),
        }
    }

    pub fn modify(from: ChangeEntry, to: ChangeEntry) -> Self {
        Change {
            action: ChangeAction::Modify,
            from_entry: Some(from),
            to_entry: Some(to),
        }
    }

    pub fn delete(from: ChangeEntry) -> Self {
        Change {
            action: ChangeAction::Delete,
            from_entry: Some(from),
            to_entry: None,
        }
    }

    pub fn rename(from: ChangeEntry, to: ChangeEntry) -> Self {
        Change {
            action: ChangeAction::Rename,
            from_entry: Some(from),
            to_entry: Some(to),
        }
    }

    /// Path the change should be tracked under after it's applied.
    pub fn effective_path(&self) -> Option<&str> {
        self.to_entry
            .as_ref()
            .or(self.from_entry.as_ref())
            .map(|e| e.path.as_str())
    }
}

/// A content-addressed blob pulled from the repository backend.
#[derive(Debug, Clone)]
pub struct CachedBlob {
    pub bytes: std::sync::Arc<[u8]>,
    pub size_in_bytes: usize,
}

impl CachedBlob {
    pub fn new(bytes: Vec<u8>) -> Self {
        let size_in_bytes = bytes.len();
        CachedBlob {
            bytes: std::sync::Arc::from(bytes.into_boxed_slice()),
            size_in_bytes,
        }
    }
}
