//! Human-readable summaries of clusters.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::assignment::{ClusterAssignment, ClusterKey};
use crate::error::{ClusterError, Result};

/// Stands in for differing text inside a merged frame.
pub const PLACEHOLDER: &str = "[...]";

/// Merge two frame strings into their common text, replacing each
/// differing stretch with [`PLACEHOLDER`].
///
/// Shared prefixes are copied; at a mismatch the longest common run
/// further on in both strings is located and the scan resumes there.
pub fn merge_common(a: &str, b: &str) -> String {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let run = |p: usize, q: usize| a[p..].iter().zip(&b[q..]).take_while(|(x, y)| x == y).count();

    let mut out = String::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            let n = run(i, j);
            out.extend(&a[i..i + n]);
            i += n;
            j += n;
            continue;
        }

        let mut best: Option<(usize, usize, usize)> = None;
        for p in i..a.len() {
            for q in j..b.len() {
                if a[p] == b[q] {
                    let n = run(p, q);
                    if best.is_none_or(|(_, _, m)| n > m) {
                        best = Some((p, q, n));
                    }
                }
            }
        }
        out.push_str(PLACEHOLDER);
        match best {
            Some((p, q, _)) => {
                i = p;
                j = q;
            }
            None => return out,
        }
    }
    if i < a.len() || j < b.len() {
        out.push_str(PLACEHOLDER);
    }
    out
}

/// Position-wise representation of a group of traces.
///
/// Up to the length of the shortest trace, a frame shared by all traces is
/// kept as is; otherwise the first trace's frame is merged with every other
/// distinct frame at that position and wrapped as `===>...<===`.
pub fn representation<S: AsRef<str>>(traces: &[Vec<S>]) -> Vec<String> {
    let Some(first) = traces.first() else {
        return Vec::new();
    };
    let depth = traces.iter().map(Vec::len).min().unwrap_or(0);

    (0..depth)
        .map(|pos| {
            let head = first[pos].as_ref();
            let others: BTreeSet<&str> = traces[1..]
                .iter()
                .map(|t| t[pos].as_ref())
                .filter(|f| *f != head)
                .collect();
            if others.is_empty() {
                head.to_string()
            } else {
                let merged = others
                    .into_iter()
                    .fold(head.to_string(), |acc, f| merge_common(&acc, f));
                format!("===>{merged}<===")
            }
        })
        .collect()
}

/// Description of one group of an assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub key: ClusterKey,
    pub ids: Vec<String>,
    pub size: usize,
    /// Distinct frame sequences among the members.
    pub unique_traces: usize,
    pub unique_ratio: f64,
    /// All members share one frame sequence.
    pub exact_match: bool,
    pub representation: Vec<String>,
}

impl ClusterSummary {
    pub fn build(key: ClusterKey, ids: Vec<String>, traces: &[Vec<String>]) -> Self {
        let unique_traces = traces.iter().collect::<HashSet<_>>().len();
        let size = traces.len();
        Self {
            key,
            ids,
            size,
            unique_traces,
            unique_ratio: if size == 0 {
                0.0
            } else {
                unique_traces as f64 / size as f64
            },
            exact_match: unique_traces == 1,
            representation: representation(traces),
        }
    }
}

/// Summarize every group of `assignment`, largest first. `ids` and
/// `traces` are indexed by document.
pub fn summarize(assignment: &ClusterAssignment, ids: &[String], traces: &[Vec<String>]) -> Result<Vec<ClusterSummary>> {
    for (what, got) in [("identifiers", ids.len()), ("traces", traces.len())] {
        if got != assignment.total() {
            return Err(ClusterError::ShapeMismatch {
                what,
                expected: assignment.total(),
                got,
            });
        }
    }

    let mut out: Vec<ClusterSummary> = assignment
        .groups()
        .map(|(key, members)| {
            let member_ids = members.iter().map(|&d| ids[d].clone()).collect();
            let member_traces: Vec<Vec<String>> = members.iter().map(|&d| traces[d].clone()).collect();
            ClusterSummary::build(key, member_ids, &member_traces)
        })
        .collect();
    out.sort_by(|a, b| b.size.cmp(&a.size).then(a.key.cmp(&b.key)));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn merge_keeps_common_runs() {
        assert_eq!(merge_common("com.a.Foo.run", "com.a.Bar.run"), "com.a.[...].run");
        assert_eq!(merge_common("same", "same"), "same");
        assert_eq!(merge_common("abc", "xyz"), "[...]");
        assert_eq!(merge_common("abc", "abcd"), "abc[...]");
        assert_eq!(merge_common("", "abc"), "[...]");
    }

    #[test]
    fn representation_marks_differing_positions() {
        let traces = vec![
            strings(&["A", "x.Foo.run", "C"]),
            strings(&["A", "x.Bar.run", "C", "D"]),
        ];
        assert_eq!(representation(&traces), vec!["A", "===>x.[...].run<===", "C"]);
    }

    #[test]
    fn representation_of_identical_traces_is_the_trace() {
        let t = strings(&["A", "B"]);
        assert_eq!(representation(&[t.clone(), t.clone()]), t);
        assert!(representation::<String>(&[]).is_empty());
    }

    #[test]
    fn summaries_sorted_by_size() {
        let clusters = BTreeMap::from([(0, vec![0, 2]), (1, vec![1])]);
        let a = ClusterAssignment::new(clusters, 3).unwrap();
        let ids = strings(&["a", "b", "c"]);
        let traces = vec![strings(&["A", "B"]), strings(&["C"]), strings(&["A", "B"])];

        let s = summarize(&a, &ids, &traces).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].key, ClusterKey::Cluster(0));
        assert_eq!(s[0].ids, vec!["a", "c"]);
        assert_eq!(s[0].unique_traces, 1);
        assert!(s[0].exact_match);
        assert!((s[0].unique_ratio - 0.5).abs() < 1e-12);
        assert_eq!(s[0].representation, vec!["A", "B"]);
        assert_eq!(s[1].size, 1);

        assert!(summarize(&a, &ids[..2], &traces).is_err());
    }

    #[test]
    fn other_bucket_is_summarized() {
        let clusters = BTreeMap::from([(0, vec![0]), (1, vec![1, 2])]);
        let a = ClusterAssignment::new(clusters, 3).unwrap().reclassify(1);
        let ids = strings(&["a", "b", "c"]);
        let traces = vec![strings(&["X"]), strings(&["A", "B"]), strings(&["A", "C"])];

        let s = summarize(&a, &ids, &traces).unwrap();
        assert_eq!(s[0].key, ClusterKey::Cluster(1));
        assert!(!s[0].exact_match);
        assert_eq!(s[0].representation, vec!["A", "===>[...]<==="]);
        assert_eq!(s[1].key, ClusterKey::Other);
        assert_eq!(s[1].ids, vec!["a"]);

        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json[0]["key"], 1);
        assert_eq!(json[1]["key"], -1);
    }
}
