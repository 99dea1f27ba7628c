//! Content addressing for frames and traces.
//!
//! Both hashes are the first 16 bytes of a SHA-256 digest. A frame hash
//! covers the frame string; a trace hash covers the frame sequence with each
//! frame prefixed by its byte length (u64, little endian), so frame
//! boundaries are part of the hashed content whatever bytes a frame holds.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const DIGEST_LEN: usize = 16;

fn truncate(full: &[u8]) -> [u8; DIGEST_LEN] {
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&full[..DIGEST_LEN]);
    out
}

/// Stable identifier of a frame string. This is the vocabulary key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameHash([u8; DIGEST_LEN]);

impl FrameHash {
    /// Hash a frame string.
    pub fn of(frame: &str) -> Self {
        Self(truncate(&Sha256::digest(frame.as_bytes())))
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl fmt::Display for FrameHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for FrameHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameHash({self})")
    }
}

/// Stable identifier of a whole frame sequence.
///
/// Traces with identical frames share a `TraceHash` regardless of the
/// identifier they were registered under.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TraceHash([u8; DIGEST_LEN]);

impl TraceHash {
    /// Hash an ordered frame sequence.
    pub fn of<S: AsRef<str>>(frames: &[S]) -> Self {
        let mut hasher = Sha256::new();
        for frame in frames {
            let bytes = frame.as_ref().as_bytes();
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        }
        Self(truncate(&hasher.finalize()))
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl fmt::Display for TraceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for TraceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraceHash({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_hash_is_deterministic() {
        let a = FrameHash::of("com.example.Foo.bar");
        let b = FrameHash::of("com.example.Foo.bar");
        assert_eq!(a, b);
        assert_ne!(a, FrameHash::of("com.example.Foo.baz"));
    }

    #[test]
    fn frame_hash_hex_display() {
        let h = FrameHash::of("x");
        let s = h.to_string();
        assert_eq!(s.len(), 32);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn trace_hash_respects_frame_boundaries() {
        assert_ne!(TraceHash::of(&["a b"]), TraceHash::of(&["a", "b"]));
        assert_ne!(TraceHash::of(&["ab"]), TraceHash::of(&["a", "b"]));
        assert_ne!(TraceHash::of(&["a\x1f", "b"]), TraceHash::of(&["a", "\x1fb"]));
        assert_ne!(TraceHash::of(&["", "a"]), TraceHash::of(&["a", ""]));
        assert_ne!(TraceHash::of::<&str>(&[]), TraceHash::of(&[""]));
    }

    #[test]
    fn trace_hash_is_order_sensitive() {
        assert_eq!(TraceHash::of(&["a", "b"]), TraceHash::of(&["a", "b"]));
        assert_ne!(TraceHash::of(&["a", "b"]), TraceHash::of(&["b", "a"]));
    }
}
