use std::collections::HashMap;

use serde_json::Value;

use crate::hash::{FrameHash, TraceHash};

/// Arbitrary static attributes attached to a node when it is first created.
pub type Attrs = HashMap<String, Value>;

/// A vocabulary entry: one distinct frame and its aggregate statistics.
///
/// Nodes are only mutated through [`Vocabulary`](crate::Vocabulary)
/// registration and are never removed.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) weight: u64,
    pub(crate) out_edges: HashMap<FrameHash, u64>,
    pub(crate) in_edges: HashMap<FrameHash, u64>,
    pub(crate) trace_frequency: HashMap<TraceHash, u64>,
    pub(crate) attrs: Option<Attrs>,
}

impl Node {
    pub(crate) fn new(name: &str, attrs: Option<&Attrs>) -> Self {
        Self {
            name: name.to_string(),
            weight: 0,
            out_edges: HashMap::new(),
            in_edges: HashMap::new(),
            trace_frequency: HashMap::new(),
            attrs: attrs.cloned(),
        }
    }

    /// The frame string.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total observed occurrences of the frame.
    pub fn weight(&self) -> u64 {
        self.weight
    }

    /// Transitions from this frame to the next frame of a trace.
    pub fn out_edges(&self) -> &HashMap<FrameHash, u64> {
        &self.out_edges
    }

    /// Transitions into this frame from the previous frame of a trace.
    pub fn in_edges(&self) -> &HashMap<FrameHash, u64> {
        &self.in_edges
    }

    /// Occurrences of this frame per distinct trace.
    pub fn trace_frequency(&self) -> &HashMap<TraceHash, u64> {
        &self.trace_frequency
    }

    pub fn attrs(&self) -> Option<&Attrs> {
        self.attrs.as_ref()
    }
}
