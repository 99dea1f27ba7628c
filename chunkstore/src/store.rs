//! The per-run chunk store and its directory lifecycle.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayView2};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::backend::{ArrayBackend, MemoryBackend, RedbBackend};
use crate::codec::{self, BlockRecord, ChunkRecord};
use crate::config::{Backend, CompressionConfig, StoreOptions};
use crate::error::{StoreError, StoreResult};

const CHUNK_GROUP: &str = "chunks";
const STORE_FILE: &str = "store.redb";

/// Opaque reference to a written chunk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChunkHandle {
    index: usize,
    rows: usize,
}

impl ChunkHandle {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of documents in the chunk.
    pub fn rows(&self) -> usize {
        self.rows
    }
}

fn block_group(i: usize) -> String {
    format!("gmat_{i}")
}

fn block_name(j: usize) -> String {
    format!("sub_mat_{j}")
}

/// Working storage for one clustering run.
///
/// Lives in a fresh `<temp_root>/<uuid>` directory. [`close`](Self::close)
/// releases the backend and [`delete`](Self::delete) removes the directory;
/// dropping the store does both.
pub struct ChunkStore {
    root: PathBuf,
    run_dir: PathBuf,
    backend: Option<Box<dyn ArrayBackend>>,
    compression: CompressionConfig,
    wiped: bool,
}

impl std::fmt::Debug for ChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStore")
            .field("run_dir", &self.run_dir)
            .field("open", &self.backend.is_some())
            .finish()
    }
}

impl ChunkStore {
    /// Create a fresh run directory under `opts.temp_root` and open the
    /// configured backend in it.
    pub fn open(opts: &StoreOptions) -> StoreResult<Self> {
        let root = opts.temp_root.clone();
        let run_dir = root.join(Uuid::new_v4().to_string());
        fs::create_dir_all(&run_dir)?;

        let backend: Box<dyn ArrayBackend> = match opts.backend {
            Backend::Redb => match RedbBackend::create(run_dir.join(STORE_FILE)) {
                Ok(b) => Box::new(b),
                Err(e) => {
                    let _ = fs::remove_dir_all(&run_dir);
                    return Err(e);
                }
            },
            Backend::Memory => Box::new(MemoryBackend::new()),
        };
        debug!("chunk store opened at {}", run_dir.display());

        Ok(Self {
            root,
            run_dir,
            backend: Some(backend),
            compression: opts.compression,
            wiped: false,
        })
    }

    /// Directory owned by this run.
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    fn backend(&self) -> StoreResult<&dyn ArrayBackend> {
        self.backend.as_deref().ok_or(StoreError::Closed)
    }

    /// Persist one chunk of membership vectors with their identifiers.
    pub fn write_chunk(
        &self,
        index: usize,
        ids: &[String],
        matrix: ArrayView2<f32>,
    ) -> StoreResult<ChunkHandle> {
        if ids.len() != matrix.nrows() {
            return Err(StoreError::ShapeMismatch {
                expected: matrix.nrows(),
                got: ids.len(),
            });
        }
        let record = ChunkRecord::pack(index, ids.to_vec(), matrix);
        let data = codec::encode(&record, self.compression)?;
        self.backend()?
            .put(CHUNK_GROUP, &index.to_string(), &data)?;
        debug!(
            "wrote chunk {index}: {}x{} in {} bytes",
            matrix.nrows(),
            matrix.ncols(),
            data.len()
        );
        Ok(ChunkHandle {
            index,
            rows: matrix.nrows(),
        })
    }

    /// Load a chunk's identifiers and 0/1 matrix.
    pub fn read_chunk(&self, handle: &ChunkHandle) -> StoreResult<(Vec<String>, Array2<f32>)> {
        let data = self
            .backend()?
            .get(CHUNK_GROUP, &handle.index.to_string())?
            .ok_or_else(|| StoreError::NotFound(format!("chunk {}", handle.index)))?;
        let record: ChunkRecord = codec::decode(&data)?;
        let matrix = record.matrix()?;
        if matrix.nrows() != handle.rows {
            return Err(StoreError::ShapeMismatch {
                expected: handle.rows,
                got: matrix.nrows(),
            });
        }
        Ok((record.ids, matrix))
    }

    /// Persist the similarity block of chunk pair `(i, j)`.
    pub fn write_block(&self, i: usize, j: usize, matrix: ArrayView2<f32>) -> StoreResult<()> {
        let data = codec::encode(&BlockRecord::from_matrix(matrix), self.compression)?;
        self.backend()?.put(&block_group(i), &block_name(j), &data)
    }

    /// Load the similarity block of chunk pair `(i, j)`.
    pub fn read_block(&self, i: usize, j: usize) -> StoreResult<Array2<f32>> {
        let data = self
            .backend()?
            .get(&block_group(i), &block_name(j))?
            .ok_or_else(|| StoreError::NotFound(format!("block ({i}, {j})")))?;
        let record: BlockRecord = codec::decode(&data)?;
        record.into_matrix()
    }

    /// Number of chunks written so far.
    pub fn chunk_count(&self) -> StoreResult<usize> {
        Ok(self.backend()?.names(CHUNK_GROUP)?.len())
    }

    /// Number of stored chunks and blocks.
    pub fn len(&self) -> StoreResult<usize> {
        self.backend()?.len()
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Release the backend. Further reads and writes fail with
    /// [`StoreError::Closed`]. Safe to call more than once.
    pub fn close(&mut self) {
        if self.backend.take().is_none() {
            return;
        }
        let file = self.run_dir.join(STORE_FILE);
        match fs::metadata(&file) {
            Ok(meta) => info!("closed chunk store, {} bytes on disk", meta.len()),
            Err(_) => info!("closed chunk store"),
        }
    }

    /// Close the store and remove its files.
    ///
    /// Individual removal failures are logged, not returned. A missing run
    /// directory is recreated and the removal retried once. On return the
    /// temporary root exists and holds nothing of this run. Idempotent.
    pub fn delete(&mut self) -> StoreResult<()> {
        self.close();

        if !self.wiped {
            self.remove_run_dir();
            self.wiped = true;
            if self.run_dir.exists() {
                error!("run directory {} still present after cleanup", self.run_dir.display());
            }
        }
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    fn remove_run_dir(&self) {
        if let Err(e) = self.remove_files() {
            if e.kind() == std::io::ErrorKind::NotFound {
                if let Err(e) = fs::create_dir_all(&self.run_dir) {
                    error!("failed to recreate {}: {e}", self.run_dir.display());
                    return;
                }
                if let Err(e) = self.remove_files() {
                    error!("cleanup retry of {} failed: {e}", self.run_dir.display());
                }
            } else {
                error!("cleanup of {} failed: {e}", self.run_dir.display());
            }
        }
        if let Err(e) = fs::remove_dir(&self.run_dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                error!("failed to remove {}: {e}", self.run_dir.display());
            }
        }
        info!("wiped chunk store {}", self.run_dir.display());
    }

    fn remove_files(&self) -> std::io::Result<()> {
        for entry in fs::read_dir(&self.run_dir)? {
            let path = entry?.path();
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            if let Err(e) = removed {
                error!("failed to remove {}: {e}", path.display());
            }
        }
        Ok(())
    }
}

impl Drop for ChunkStore {
    fn drop(&mut self) {
        if let Err(e) = self.delete() {
            error!("chunk store cleanup on drop failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use tempfile::tempdir;

    use super::*;

    fn options(root: &Path, backend: Backend) -> StoreOptions {
        StoreOptions {
            temp_root: root.to_path_buf(),
            backend,
            ..Default::default()
        }
    }

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("doc-{i}")).collect()
    }

    #[test]
    fn chunks_and_blocks_round_trip() {
        for backend in [Backend::Redb, Backend::Memory] {
            let dir = tempdir().unwrap();
            let store = ChunkStore::open(&options(dir.path(), backend)).unwrap();

            let m = array![[1.0, 0.0, 1.0], [0.0, 1.0, 0.0]];
            let h = store.write_chunk(0, &ids(2), m.view()).unwrap();
            assert_eq!(h.rows(), 2);
            let (got_ids, got) = store.read_chunk(&h).unwrap();
            assert_eq!(got_ids, ids(2));
            assert_eq!(got, m);

            let b = array![[1.0, 0.5], [0.5, 1.0]];
            store.write_block(0, 1, b.view()).unwrap();
            assert_eq!(store.read_block(0, 1).unwrap(), b);
            assert!(matches!(store.read_block(1, 0), Err(StoreError::NotFound(_))));
            assert_eq!(store.len().unwrap(), 2);
            assert_eq!(store.chunk_count().unwrap(), 1);
        }
    }

    #[test]
    fn rejects_id_count_mismatch() {
        let dir = tempdir().unwrap();
        let store = ChunkStore::open(&options(dir.path(), Backend::Memory)).unwrap();
        let err = store
            .write_chunk(0, &ids(3), array![[1.0], [0.0]].view())
            .unwrap_err();
        assert!(matches!(err, StoreError::ShapeMismatch { expected: 2, got: 3 }));
    }

    #[test]
    fn closed_store_refuses_io() {
        let dir = tempdir().unwrap();
        let mut store = ChunkStore::open(&options(dir.path(), Backend::Redb)).unwrap();
        store.close();
        store.close();
        assert!(!store.is_open());
        assert!(matches!(store.read_block(0, 0), Err(StoreError::Closed)));
    }

    #[test]
    fn delete_leaves_empty_root_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("tmp");
        let mut store = ChunkStore::open(&options(&root, Backend::Redb)).unwrap();
        store.write_block(0, 0, array![[1.0]].view()).unwrap();
        assert!(store.run_dir().join(STORE_FILE).exists());

        store.delete().unwrap();
        assert!(root.is_dir());
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);

        store.delete().unwrap();
        assert!(root.is_dir());
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
    }

    #[test]
    fn delete_tolerates_missing_directories() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("tmp");
        let mut store = ChunkStore::open(&options(&root, Backend::Memory)).unwrap();
        fs::remove_dir_all(&root).unwrap();

        store.delete().unwrap();
        assert!(root.is_dir());
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
    }

    #[test]
    fn drop_wipes_run_directory() {
        let dir = tempdir().unwrap();
        let run_dir = {
            let store = ChunkStore::open(&options(dir.path(), Backend::Redb)).unwrap();
            store.run_dir().to_path_buf()
        };
        assert!(!run_dir.exists());
        assert!(dir.path().is_dir());
    }

    #[test]
    fn runs_get_distinct_directories() {
        let dir = tempdir().unwrap();
        let a = ChunkStore::open(&options(dir.path(), Backend::Memory)).unwrap();
        let b = ChunkStore::open(&options(dir.path(), Backend::Memory)).unwrap();
        assert_ne!(a.run_dir(), b.run_dir());
    }
}
