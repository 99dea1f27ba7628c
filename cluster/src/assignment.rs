use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};
use crate::greedy::ClusterId;

/// Key of a group in a [`ClusterAssignment`]. Serialized as its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum ClusterKey {
    Cluster(ClusterId),
    /// Catch-all bucket for documents of reclassified small clusters.
    Other,
}

impl ClusterKey {
    /// Numeric label; `-1` for the other bucket.
    pub fn label(&self) -> i64 {
        match self {
            ClusterKey::Cluster(id) => *id as i64,
            ClusterKey::Other => -1,
        }
    }
}

impl From<ClusterKey> for i64 {
    fn from(key: ClusterKey) -> i64 {
        key.label()
    }
}

impl TryFrom<i64> for ClusterKey {
    type Error = String;

    fn try_from(label: i64) -> std::result::Result<Self, String> {
        match label {
            -1 => Ok(ClusterKey::Other),
            n if n >= 0 => Ok(ClusterKey::Cluster(n as ClusterId)),
            n => Err(format!("invalid cluster label {n}")),
        }
    }
}

impl fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterKey::Cluster(id) => write!(f, "{id}"),
            ClusterKey::Other => write!(f, "other"),
        }
    }
}

/// Partition of documents `0..total` into clusters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAssignment {
    clusters: BTreeMap<ClusterId, Vec<usize>>,
    other: Vec<usize>,
    total: usize,
}

impl ClusterAssignment {
    /// Wrap clusterer output, checking that it partitions `0..total`.
    pub fn new(clusters: BTreeMap<ClusterId, Vec<usize>>, total: usize) -> Result<Self> {
        let mut seen = vec![false; total];
        let mut count = 0;
        for (id, members) in &clusters {
            for &doc in members {
                match seen.get_mut(doc) {
                    Some(s) if !*s => *s = true,
                    Some(_) => {
                        return Err(ClusterError::InternalConsistency(format!(
                            "document {doc} assigned twice (cluster {id})"
                        )));
                    }
                    None => {
                        return Err(ClusterError::InternalConsistency(format!(
                            "document {doc} out of range 0..{total} (cluster {id})"
                        )));
                    }
                }
                count += 1;
            }
        }
        if count != total {
            return Err(ClusterError::InternalConsistency(format!(
                "{count} of {total} documents assigned"
            )));
        }
        Ok(Self {
            clusters,
            other: Vec::new(),
            total,
        })
    }

    /// Number of documents.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Clusters kept after any reclassification.
    pub fn clusters(&self) -> &BTreeMap<ClusterId, Vec<usize>> {
        &self.clusters
    }

    /// Documents in the other bucket, ascending.
    pub fn other(&self) -> &[usize] {
        &self.other
    }

    /// Number of clusters, not counting the other bucket.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty() && self.other.is_empty()
    }

    /// All groups including the other bucket (last, if non-empty).
    pub fn groups(&self) -> impl Iterator<Item = (ClusterKey, &[usize])> {
        self.clusters
            .iter()
            .map(|(id, m)| (ClusterKey::Cluster(*id), m.as_slice()))
            .chain((!self.other.is_empty()).then_some((ClusterKey::Other, self.other.as_slice())))
    }

    /// Move clusters with at most `min_size` documents to the other bucket.
    /// Kept clusters retain their ids.
    pub fn reclassify(mut self, min_size: usize) -> Self {
        let small: Vec<ClusterId> = self
            .clusters
            .iter()
            .filter(|(_, m)| m.len() <= min_size)
            .map(|(id, _)| *id)
            .collect();
        for id in small {
            if let Some(members) = self.clusters.remove(&id) {
                self.other.extend(members);
            }
        }
        self.other.sort_unstable();
        self
    }

    /// Group of every document.
    pub fn keys(&self) -> Vec<ClusterKey> {
        let mut keys = vec![ClusterKey::Other; self.total];
        for (id, members) in &self.clusters {
            for &doc in members {
                keys[doc] = ClusterKey::Cluster(*id);
            }
        }
        keys
    }

    /// Numeric label of every document; `-1` for the other bucket.
    pub fn labels(&self) -> Vec<i64> {
        self.keys().iter().map(ClusterKey::label).collect()
    }

    /// Replace document indices with the external identifiers in `ids`.
    pub fn resolve(&self, ids: &[String]) -> Result<BTreeMap<ClusterKey, Vec<String>>> {
        if ids.len() != self.total {
            return Err(ClusterError::ShapeMismatch {
                what: "identifiers",
                expected: self.total,
                got: ids.len(),
            });
        }
        Ok(self
            .groups()
            .map(|(key, members)| (key, members.iter().map(|&d| ids[d].clone()).collect()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ClusterAssignment {
        let clusters = BTreeMap::from([
            (0, vec![0, 2, 5, 6]),
            (1, vec![1]),
            (2, vec![3, 4]),
        ]);
        ClusterAssignment::new(clusters, 7).unwrap()
    }

    #[test]
    fn rejects_non_partitions() {
        let dup = BTreeMap::from([(0, vec![0, 1]), (1, vec![1])]);
        assert!(matches!(
            ClusterAssignment::new(dup, 2),
            Err(ClusterError::InternalConsistency(_))
        ));
        let missing = BTreeMap::from([(0, vec![0])]);
        assert!(ClusterAssignment::new(missing, 2).is_err());
        let out_of_range = BTreeMap::from([(0, vec![0, 5])]);
        assert!(ClusterAssignment::new(out_of_range, 2).is_err());
    }

    #[test]
    fn reclassify_moves_small_clusters() {
        let a = sample().reclassify(2);
        assert_eq!(a.len(), 1);
        assert_eq!(a.clusters()[&0], vec![0, 2, 5, 6]);
        assert_eq!(a.other(), &[1, 3, 4]);
        assert_eq!(a.labels(), vec![0, -1, 0, -1, -1, 0, 0]);
        assert_eq!(a.total(), 7);
    }

    #[test]
    fn reclassify_zero_keeps_everything() {
        let a = sample().reclassify(0);
        assert_eq!(a, sample());
        assert_eq!(a.labels(), vec![0, 1, 0, 2, 2, 0, 0]);
    }

    #[test]
    fn resolve_maps_external_ids() {
        let ids: Vec<String> = "abcdefg".chars().map(String::from).collect();
        let groups = sample().reclassify(1).resolve(&ids).unwrap();
        assert_eq!(groups[&ClusterKey::Cluster(0)], vec!["a", "c", "f", "g"]);
        assert_eq!(groups[&ClusterKey::Cluster(2)], vec!["d", "e"]);
        assert_eq!(groups[&ClusterKey::Other], vec!["b"]);

        assert!(sample().resolve(&ids[..3]).is_err());
    }

    #[test]
    fn key_display_and_labels() {
        assert_eq!(ClusterKey::Cluster(4).to_string(), "4");
        assert_eq!(ClusterKey::Other.to_string(), "other");
        assert_eq!(ClusterKey::Other.label(), -1);
        assert!(ClusterKey::Cluster(usize::MAX) < ClusterKey::Other);
        assert_eq!(ClusterKey::try_from(-1), Ok(ClusterKey::Other));
        assert_eq!(ClusterKey::try_from(3), Ok(ClusterKey::Cluster(3)));
        assert!(ClusterKey::try_from(-2).is_err());
    }
}
