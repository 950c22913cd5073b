pub mod capsule;
pub mod change;
pub mod collections;
pub mod hash;
pub mod tick;

pub use capsule::{TickAggregate, TickCapsule};
pub use change::{CachedBlob, Change, ChangeAction, ChangeEntry};
pub use collections::{FxHashMap, FxHashSet};
pub use hash::Hash;
pub use tick::{AuthorId, Tick};
