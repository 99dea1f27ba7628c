//! Frame vocabulary for stack-trace clustering.
//!
//! A [`Vocabulary`] is an append-only graph: every distinct frame string is
//! a [`Node`] keyed by its content hash, consecutive frames of a trace are
//! linked by counted directed edges, and every registered trace is indexed
//! by the hash of its whole frame sequence.
//!
//! Clustering runs work against a frozen [`VocabularySnapshot`], which fixes
//! the frame ordering used by [`MembershipVector`]s.
//!
//! ```
//! use tracegroup_vocab::Vocabulary;
//!
//! let mut vocab = Vocabulary::new();
//! vocab.register("t0", &["a.A.run", "a.B.call"], None).unwrap();
//! vocab.register("t1", &["a.A.run", "c.C.fail"], None).unwrap();
//!
//! let snapshot = vocab.snapshot();
//! let v = snapshot.vectorize(&["a.A.run", "x.Unknown.frame"]);
//! assert_eq!(v.dim(), 3);
//! assert_eq!(v.weight(), 1);
//! ```

pub mod config;
pub mod error;
pub mod hash;
pub mod node;
pub mod parse;
pub mod snapshot;
pub mod trace;
pub mod vectorizer;
pub mod vocabulary;

pub use config::VocabConfig;
pub use error::VocabError;
pub use hash::{FrameHash, TraceHash};
pub use node::{Attrs, Node};
pub use parse::{FrameParser, ParsedLogs};
pub use snapshot::VocabularySnapshot;
pub use trace::TraceIndex;
pub use vectorizer::{MembershipVector, vectorize};
pub use vocabulary::{AddReport, Vocabulary};
