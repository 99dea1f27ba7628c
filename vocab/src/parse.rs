//! Frame extraction from raw error-log text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

/// Matches one JVM-style stack line: `\tat com.example.Foo.bar(Foo.java:42)`.
///
/// Any leading whitespace is accepted, not just a tab, and the last line of a
/// log needs no trailing newline.
static STACK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*at\s+(.+)\(.*\)\s*$").expect("valid stack line pattern")
});

/// Extract the frames of one log, top of stack first.
pub fn parse_frames(log: &str) -> Vec<String> {
    STACK_LINE
        .captures_iter(log)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

/// Returns true if `log` looks like a pre-hashed trace: comma-separated
/// tokens without any ASCII letter.
pub fn is_prehashed(log: &str) -> bool {
    !log.chars().any(|c| c.is_ascii_alphabetic())
}

/// Result of [`FrameParser::validate`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedLogs {
    /// Frames of every valid log, in input order.
    pub traces: Vec<Vec<String>>,

    /// Input positions of `traces`.
    pub valid_indices: Vec<usize>,

    /// Input positions of logs that produced no usable frame.
    pub excluded_indices: Vec<usize>,
}

/// Turns raw logs into frame sequences.
#[derive(Debug, Clone, Default)]
pub struct FrameParser {
    detect_prehashed: bool,
    excluded: HashSet<String>,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// When enabled and the first log of a batch has no ASCII letter, the
    /// whole batch is split on commas instead of parsed as stack text.
    pub fn with_prehashed_detection(mut self, enabled: bool) -> Self {
        self.detect_prehashed = enabled;
        self
    }

    /// Frames dropped from every parsed trace (runner boilerplate and the
    /// like).
    pub fn exclude<I, S>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(frames.into_iter().map(Into::into));
        self
    }

    fn prehashed_batch<S: AsRef<str>>(&self, logs: &[S]) -> bool {
        self.detect_prehashed && logs.first().is_some_and(|l| is_prehashed(l.as_ref()))
    }

    fn parse_one(&self, log: &str, prehashed: bool) -> Vec<String> {
        let frames: Vec<String> = if prehashed {
            log.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            parse_frames(log)
        };
        self.filter(frames)
    }

    /// Drop excluded frames from an already split trace.
    pub fn filter(&self, frames: Vec<String>) -> Vec<String> {
        frames
            .into_iter()
            .filter(|f| !self.excluded.contains(f))
            .collect()
    }

    /// Parse every log. Logs without frames yield empty traces.
    pub fn parse<S: AsRef<str>>(&self, logs: &[S]) -> Vec<Vec<String>> {
        let prehashed = self.prehashed_batch(logs);
        logs.iter()
            .map(|l| self.parse_one(l.as_ref(), prehashed))
            .collect()
    }

    /// Parse every log and split valid from excluded ones.
    pub fn validate<S: AsRef<str>>(&self, logs: &[S]) -> ParsedLogs {
        let mut out = ParsedLogs::default();
        for (i, frames) in self.parse(logs).into_iter().enumerate() {
            if frames.is_empty() {
                out.excluded_indices.push(i);
            } else {
                out.valid_indices.push(i);
                out.traces.push(frames);
            }
        }
        if !out.excluded_indices.is_empty() {
            let head: Vec<usize> = out.excluded_indices.iter().take(5).copied().collect();
            info!(
                "auto excluded {} error logs without frames {:?}...",
                out.excluded_indices.len(),
                head
            );
        }
        out
    }
}
