//! Disk-backed working storage for membership-vector chunks and similarity
//! blocks.
//!
//! A [`ChunkStore`] owns one fresh directory under a temporary root for the
//! duration of a clustering run. Arrays are stored as compressed binary
//! records behind the [`ArrayBackend`] trait, with a redb file for
//! persistence and an in-memory map for tests and small corpora.
//!
//! Chunks are addressed by index, blocks by the two-level key
//! `gmat_{i}/sub_mat_{j}`. Only the array being read or written is held in
//! memory at any time.

pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod store;

pub use backend::{ArrayBackend, MemoryBackend, RedbBackend};
pub use config::{Backend, CompressionConfig, StoreOptions};
pub use error::{StoreError, StoreResult};
pub use store::{ChunkHandle, ChunkStore};
