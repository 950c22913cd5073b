//! Shared fast-hashing collection aliases, mirroring the teacher's
//! `drift_core::types::collections`.

pub type FxHashMap<K, V> = std::collections::HashMap<K, V, rustc_hash::FxBuildHasher>;
pub type FxHashSet<K> = std::collections::HashSet<K, rustc_hash::FxBuildHasher>;
