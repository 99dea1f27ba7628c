use std::collections::HashMap;
use std::sync::Arc;

use crate::hash::FrameHash;
use crate::vectorizer::{MembershipVector, vectorize};

/// A frozen frame ordering.
///
/// Position `i` of every [`MembershipVector`] produced against this
/// snapshot refers to `frames()[i]`. Vectors from different snapshots are
/// not comparable. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct VocabularySnapshot {
    frames: Arc<[FrameHash]>,
    positions: Arc<HashMap<FrameHash, usize>>,
}

impl VocabularySnapshot {
    /// Build a snapshot from hashes in dimension order. Repeated hashes keep
    /// their first position.
    pub fn from_hashes(hashes: impl IntoIterator<Item = FrameHash>) -> Self {
        let mut frames = Vec::new();
        let mut positions = HashMap::new();
        for h in hashes {
            if !positions.contains_key(&h) {
                positions.insert(h, frames.len());
                frames.push(h);
            }
        }
        Self {
            frames: frames.into(),
            positions: Arc::new(positions),
        }
    }

    /// Build a snapshot from frame strings in dimension order.
    pub fn from_frames<S: AsRef<str>>(frames: &[S]) -> Self {
        Self::from_hashes(frames.iter().map(|f| FrameHash::of(f.as_ref())))
    }

    /// Vector width.
    pub fn dim(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[FrameHash] {
        &self.frames
    }

    pub fn position(&self, hash: &FrameHash) -> Option<usize> {
        self.positions.get(hash).copied()
    }

    /// See [`vectorize`].
    pub fn vectorize<S: AsRef<str>>(&self, trace: &[S]) -> MembershipVector {
        vectorize(trace, self)
    }
}
