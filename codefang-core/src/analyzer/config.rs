//! Configuration options and typed facts (spec §4.2, §9 design note).

use crate::types::{FxHashMap, Hash, Tick};

/// Type of a configuration option's value, as enumerated by
/// `list_configuration_options()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ConfigOptionType {
    Bool,
    Int,
    Float,
    String,
    StringList,
    Path,
}

/// A concrete configuration value, tagged by `ConfigOptionType`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    StringList(Vec<String>),
    Path(String),
}

/// One configuration knob an analyzer exposes. Names starting with
/// `Fact*` denote facts published upstream rather than user-facing flags.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ConfigOption {
    pub name: String,
    pub description: String,
    pub flag: String,
    pub option_type: ConfigOptionType,
    pub default: ConfigValue,
}

impl ConfigOption {
    pub fn is_fact(&self) -> bool {
        self.name.starts_with("Fact")
    }
}

/// Typed union of facts analyzers can publish to or consume from each
/// other via `configure()`. A closed enum (rather than the source's
/// `map[string]any`) so `configure` can reject unknown facts instead of
/// silently ignoring a typo'd key.
#[derive(Debug, Clone)]
pub enum Fact {
    /// Commit hashes bucketed by the tick they fall into. Published by
    /// the `Ticks` plumbing analyzer.
    CommitsByTick(FxHashMap<Tick, Vec<Hash>>),
    /// Length in seconds of one tick window. Published by `Ticks`.
    TickDurationSeconds(i64),
    /// Whether the run was restricted to the first-parent chain.
    FirstParentOnly(bool),
    /// Dense author-id count, published by the identity plumbing stage.
    AuthorCount(usize),
    /// Arbitrary string-keyed scalar, for analyzer-specific tuning that
    /// doesn't warrant its own variant.
    Scalar(String, ConfigValue),
}

impl Fact {
    pub fn name(&self) -> String {
        match self {
            Fact::CommitsByTick(_) => "FactCommitsByTick".to_string(),
            Fact::TickDurationSeconds(_) => "FactTickDurationSeconds".to_string(),
            Fact::FirstParentOnly(_) => "FactFirstParentOnly".to_string(),
            Fact::AuthorCount(_) => "FactAuthorCount".to_string(),
            Fact::Scalar(name, _) => format!("Fact{name}"),
        }
    }
}
