//! Byte-level storage behind the chunk store.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Mutex;

use redb::{Database, Durability, ReadableTable, ReadableTableMetadata, TableDefinition};

use crate::error::{StoreError, StoreResult};

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("arrays");

/// Grouped key-value storage for encoded arrays.
///
/// Keys are `(group, name)` pairs; a group holds the blocks of one row of
/// chunks, or the chunks themselves.
pub trait ArrayBackend: Send + Sync {
    /// Store a value, replacing any previous one.
    fn put(&self, group: &str, name: &str, value: &[u8]) -> StoreResult<()>;

    /// Get a value.
    fn get(&self, group: &str, name: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Names stored under `group`, sorted.
    fn names(&self, group: &str) -> StoreResult<Vec<String>>;

    /// Total number of stored values.
    fn len(&self) -> StoreResult<usize>;
}

impl fmt::Debug for dyn ArrayBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArrayBackend {{ ... }}")
    }
}

fn key(group: &str, name: &str) -> String {
    format!("{group}/{name}")
}

/// In-memory backend.
#[derive(Default)]
pub struct MemoryBackend {
    data: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArrayBackend for MemoryBackend {
    fn put(&self, group: &str, name: &str, value: &[u8]) -> StoreResult<()> {
        let mut data = self.data.lock().map_err(StoreError::storage)?;
        data.insert(key(group, name), value.to_vec());
        Ok(())
    }

    fn get(&self, group: &str, name: &str) -> StoreResult<Option<Vec<u8>>> {
        let data = self.data.lock().map_err(StoreError::storage)?;
        Ok(data.get(&key(group, name)).cloned())
    }

    fn names(&self, group: &str) -> StoreResult<Vec<String>> {
        let data = self.data.lock().map_err(StoreError::storage)?;
        let prefix = key(group, "");
        Ok(data
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .map(str::to_string)
            .collect())
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.data.lock().map_err(StoreError::storage)?.len())
    }
}

/// Backend persisted in a single redb file.
///
/// Writes skip fsync: the file is scratch space that never outlives the
/// process.
pub struct RedbBackend {
    db: Database,
}

impl RedbBackend {
    /// Create the database file at `path`. The parent directory must exist.
    pub fn create<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = Database::create(path).map_err(StoreError::storage)?;

        let tx = db.begin_write().map_err(StoreError::storage)?;
        {
            let _ = tx.open_table(TABLE).map_err(StoreError::storage)?;
        }
        tx.commit().map_err(StoreError::storage)?;

        Ok(Self { db })
    }
}

impl ArrayBackend for RedbBackend {
    fn put(&self, group: &str, name: &str, value: &[u8]) -> StoreResult<()> {
        let k = key(group, name);
        let mut tx = self.db.begin_write().map_err(StoreError::storage)?;
        tx.set_durability(Durability::None);
        {
            let mut table = tx.open_table(TABLE).map_err(StoreError::storage)?;
            table
                .insert(k.as_str(), value)
                .map_err(StoreError::storage)?;
        }
        tx.commit().map_err(StoreError::storage)
    }

    fn get(&self, group: &str, name: &str) -> StoreResult<Option<Vec<u8>>> {
        let tx = self.db.begin_read().map_err(StoreError::storage)?;
        let table = tx.open_table(TABLE).map_err(StoreError::storage)?;
        let k = key(group, name);
        let value = table.get(k.as_str()).map_err(StoreError::storage)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn names(&self, group: &str) -> StoreResult<Vec<String>> {
        let tx = self.db.begin_read().map_err(StoreError::storage)?;
        let table = tx.open_table(TABLE).map_err(StoreError::storage)?;
        let prefix = key(group, "");

        let mut names = Vec::new();
        for item in table.iter().map_err(StoreError::storage)? {
            let (k, _) = item.map_err(StoreError::storage)?;
            if let Some(name) = k.value().strip_prefix(prefix.as_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn len(&self) -> StoreResult<usize> {
        let tx = self.db.begin_read().map_err(StoreError::storage)?;
        let table = tx.open_table(TABLE).map_err(StoreError::storage)?;
        let n = table.len().map_err(StoreError::storage)?;
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn exercise(backend: &dyn ArrayBackend) {
        backend.put("gmat_0", "sub_mat_1", b"b01").unwrap();
        backend.put("gmat_0", "sub_mat_0", b"b00").unwrap();
        backend.put("gmat_1", "sub_mat_0", b"b10").unwrap();
        backend.put("chunks", "0", b"c0").unwrap();
        backend.put("chunks", "1", b"c1").unwrap();

        assert_eq!(backend.get("gmat_0", "sub_mat_1").unwrap(), Some(b"b01".to_vec()));
        assert_eq!(backend.get("gmat_2", "sub_mat_0").unwrap(), None);
        assert_eq!(backend.names("gmat_0").unwrap(), vec!["sub_mat_0", "sub_mat_1"]);
        assert_eq!(backend.names("chunks").unwrap(), vec!["0", "1"]);
        assert_eq!(backend.len().unwrap(), 5);

        backend.put("gmat_0", "sub_mat_0", b"new").unwrap();
        assert_eq!(backend.get("gmat_0", "sub_mat_0").unwrap(), Some(b"new".to_vec()));
        assert_eq!(backend.len().unwrap(), 5);
    }

    #[test]
    fn memory_backend() {
        exercise(&MemoryBackend::new());
    }

    #[test]
    fn redb_backend() {
        let dir = tempdir().unwrap();
        let backend = RedbBackend::create(dir.path().join("store.redb")).unwrap();
        exercise(&backend);
    }

    #[test]
    fn group_prefix_does_not_leak() {
        let backend = MemoryBackend::new();
        backend.put("gmat_1", "a", b"x").unwrap();
        backend.put("gmat_10", "b", b"y").unwrap();
        assert_eq!(backend.names("gmat_1").unwrap(), vec!["a"]);
    }
}
