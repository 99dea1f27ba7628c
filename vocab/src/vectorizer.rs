use crate::hash::FrameHash;
use crate::snapshot::VocabularySnapshot;

/// Boolean membership of a trace over a snapshot's frames.
///
/// Order and multiplicity of frames in the trace are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipVector {
    bits: Vec<bool>,
}

impl MembershipVector {
    pub fn zeros(dim: usize) -> Self {
        Self {
            bits: vec![false; dim],
        }
    }

    pub fn dim(&self) -> usize {
        self.bits.len()
    }

    /// Number of set entries (Hamming weight).
    pub fn weight(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// True if the trace matched no frame of the snapshot. Such vectors
    /// have zero norm and cannot take part in cosine similarity.
    pub fn is_zero(&self) -> bool {
        !self.bits.iter().any(|&b| b)
    }

    pub fn get(&self, i: usize) -> bool {
        self.bits.get(i).copied().unwrap_or(false)
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.bits
    }

    /// Positions of set entries, ascending.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| b.then_some(i))
    }
}

/// Convert a trace into a membership vector over `snapshot`.
///
/// Frames absent from the snapshot contribute nothing, so traces with
/// unseen frames still vectorize at reduced fidelity. A trace with no known
/// frame yields the zero vector; callers filter those before similarity.
pub fn vectorize<S: AsRef<str>>(trace: &[S], snapshot: &VocabularySnapshot) -> MembershipVector {
    let mut v = MembershipVector::zeros(snapshot.dim());
    for frame in trace {
        if let Some(pos) = snapshot.position(&FrameHash::of(frame.as_ref())) {
            v.bits[pos] = true;
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vocabulary;

    fn snapshot() -> VocabularySnapshot {
        let mut vocab = Vocabulary::new();
        vocab.register("0", &["A", "B", "C"], None).unwrap();
        vocab.snapshot()
    }

    #[test]
    fn weight_counts_distinct_known_frames() {
        let s = snapshot();
        let v = s.vectorize(&["A", "B", "A", "A"]);
        assert_eq!(v.dim(), 3);
        assert_eq!(v.weight(), 2);
        assert_eq!(v.ones().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn unknown_frames_are_ignored() {
        let s = snapshot();
        let v = s.vectorize(&["C", "Z.unseen"]);
        assert_eq!(v.weight(), 1);
        assert!(v.get(2));
        assert!(!v.get(7));
    }

    #[test]
    fn no_known_frames_gives_zero_vector() {
        let s = snapshot();
        let v = vectorize(&["X", "Y"], &s);
        assert!(v.is_zero());
        assert_eq!(v, MembershipVector::zeros(3));
    }
}
