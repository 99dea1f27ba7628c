use std::collections::HashMap;

use crate::hash::TraceHash;

/// Index of registered traces.
///
/// Identifiers are kept in registration order. Traces with identical frames
/// collapse onto one [`TraceHash`] for frequency counting while each
/// identifier still resolves to its own trace.
#[derive(Debug, Default, Clone)]
pub struct TraceIndex {
    ids: Vec<String>,
    id_trace: HashMap<String, TraceHash>,
    traces: HashMap<TraceHash, Vec<String>>,
    frequency: HashMap<TraceHash, u64>,
}

impl TraceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn track<S: AsRef<str>>(&mut self, id: &str, frames: &[S], hash: TraceHash) {
        if self.id_trace.insert(id.to_string(), hash).is_none() {
            self.ids.push(id.to_string());
        }
        self.traces
            .entry(hash)
            .or_insert_with(|| frames.iter().map(|f| f.as_ref().to_string()).collect());
        *self.frequency.entry(hash).or_insert(0) += 1;
    }

    /// Returns true if `id` has been registered.
    pub fn contains(&self, id: &str) -> bool {
        self.id_trace.contains_key(id)
    }

    /// Registered identifiers, oldest first.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Number of registered identifiers.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of distinct frame sequences.
    pub fn distinct(&self) -> usize {
        self.traces.len()
    }

    pub fn hash_of(&self, id: &str) -> Option<TraceHash> {
        self.id_trace.get(id).copied()
    }

    pub fn trace(&self, hash: &TraceHash) -> Option<&[String]> {
        self.traces.get(hash).map(Vec::as_slice)
    }

    pub fn trace_of(&self, id: &str) -> Option<&[String]> {
        self.hash_of(id).and_then(|h| self.trace(&h))
    }

    /// How many registrations produced this frame sequence.
    pub fn frequency(&self, hash: &TraceHash) -> u64 {
        self.frequency.get(hash).copied().unwrap_or(0)
    }

    pub(crate) fn frequencies(&self) -> impl Iterator<Item = (&TraceHash, &u64)> {
        self.frequency.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_traces_share_hash() {
        let mut idx = TraceIndex::new();
        let h = TraceHash::of(&["a", "b"]);
        idx.track("1", &["a", "b"], h);
        idx.track("2", &["a", "b"], h);

        assert_eq!(idx.len(), 2);
        assert_eq!(idx.distinct(), 1);
        assert_eq!(idx.frequency(&h), 2);
        assert_eq!(idx.trace_of("2").unwrap(), ["a", "b"]);
        assert_eq!(idx.ids(), ["1", "2"]);
    }

    #[test]
    fn retracking_id_keeps_order() {
        let mut idx = TraceIndex::new();
        let h = TraceHash::of(&["a"]);
        idx.track("1", &["a"], h);
        idx.track("1", &["a"], h);
        assert_eq!(idx.ids(), ["1"]);
        assert_eq!(idx.frequency(&h), 2);
    }
}
