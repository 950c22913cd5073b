//! Type-erased analyzer payload (spec §9 design note: "make TC and TICK
//! generic over an analyzer-defined payload type; the coordinator then
//! holds a heterogeneous set via a trait object").
//!
//! Each analyzer defines its own concrete payload struct and implements
//! `Payload` for it; the coordinator only ever touches `Box<dyn Payload>`.

use std::any::Any;
use std::fmt::Debug;

pub trait Payload: Any + Debug + Send + Sync {
    /// True when this payload represents "nothing to report" (spec §3.2).
    fn is_empty(&self) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn clone_box(&self) -> Box<dyn Payload>;

    /// Serializes this payload into a JSON value, the one representation
    /// every downstream form (YAML, the binary envelope, NDJSON) is
    /// derived from by report assembly (spec §4.11). Never fails in
    /// practice since every concrete payload is plain serde-friendly
    /// data; implementers that truly cannot serialize should return
    /// `serde_json::Value::Null` rather than panicking.
    fn to_json(&self) -> serde_json::Value;
}

impl Clone for Box<dyn Payload> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// The empty payload used by plumbing stages that only publish facts
/// rather than per-commit data, and as the default for `TC::is_empty`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmptyPayload;

impl Payload for EmptyPayload {
    fn is_empty(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Payload> {
        Box::new(self.clone())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

/// Downcasts a payload, returning `None` (rather than panicking) on a
/// type mismatch — callers decide whether that's an error.
pub fn downcast<T: 'static>(payload: &dyn Payload) -> Option<&T> {
    payload.as_any().downcast_ref::<T>()
}
