//! JSON snapshot record store
//!
//! A [`MemoryStore`] that writes every mutation through to a JSON file
//! under the data directory. The file holds the whole table in ascending
//! id order and is replaced atomically (write to `*.tmp`, then rename).
//! When the snapshot cannot be written the cached change is undone, so the
//! cache never holds a row the file does not.

use crate::error::{Error, Result};
use crate::storage::engine::{Filter, Order, Record, RecordStore};
use crate::storage::memory::MemoryStore;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// File-backed record store
pub struct FileStore<R> {
    cache: MemoryStore<R>,
    path: PathBuf,
    /// Serializes mutate-then-persist so snapshots land in order
    write_lock: Mutex<()>,
}

impl<R: Record> FileStore<R> {
    /// Open (or create) `<dir>/<table>.json`
    pub async fn open(dir: impl AsRef<Path>, table: &str) -> Result<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::Storage(format!("Failed to create {}: {}", dir.display(), e)))?;

        let path = dir.join(format!("{}.json", table));
        let cache = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let rows: Vec<R> = serde_json::from_slice(&bytes).map_err(|e| {
                    Error::SerializationError(format!("{}: {}", path.display(), e))
                })?;
                info!(table = %table, rows = rows.len(), "Loaded table snapshot");
                MemoryStore::from_rows(table, rows)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => MemoryStore::new(table),
            Err(e) => {
                return Err(Error::Storage(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        Ok(Self {
            cache,
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[instrument(skip(self), fields(table = %self.cache.table()))]
    async fn persist(&self) -> Result<()> {
        let rows = self.cache.snapshot();
        let bytes = serde_json::to_vec(&rows)
            .map_err(|e| Error::SerializationError(format!("JSON serialization failed: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| Error::Storage(format!("Failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::Storage(format!("Failed to replace {}: {}", self.path.display(), e)))?;

        debug!(rows = rows.len(), bytes = bytes.len(), "Persisted table snapshot");
        Ok(())
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for FileStore<R> {
    fn table(&self) -> &str {
        self.cache.table()
    }

    async fn create(&self, record: R) -> Result<R> {
        let _guard = self.write_lock.lock().await;
        let created = self.cache.create(record).await?;
        if let Err(e) = self.persist().await {
            self.cache.delete_by_id(created.id()).await?;
            return Err(e);
        }
        Ok(created)
    }

    async fn find_by_id(&self, id: u32) -> Result<Option<R>> {
        self.cache.find_by_id(id).await
    }

    async fn find_all(&self, order: Order, filter: Option<Filter<'_, R>>) -> Result<Vec<R>> {
        self.cache.find_all(order, filter).await
    }

    async fn update_by_id(&self, id: u32, record: R) -> Result<R> {
        let _guard = self.write_lock.lock().await;
        let previous = self.cache.find_by_id(id).await?;
        let updated = self.cache.update_by_id(id, record).await?;
        if let Err(e) = self.persist().await {
            if let Some(previous) = previous {
                self.cache.update_by_id(updated.id(), previous).await?;
            }
            return Err(e);
        }
        Ok(updated)
    }

    async fn delete_by_id(&self, id: u32) -> Result<R> {
        let _guard = self.write_lock.lock().await;
        let removed = self.cache.delete_by_id(id).await?;
        if let Err(e) = self.persist().await {
            self.cache.create(removed).await?;
            return Err(e);
        }
        Ok(removed)
    }

    async fn find_first(&self, order: Order) -> Result<Option<R>> {
        self.cache.find_first(order).await
    }

    async fn count(&self) -> Result<usize> {
        self.cache.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Table;
    use crate::storage::memory::tests::{row, Row};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!(
            "bookfair_file_store_{}_{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ))
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() -> Result<()> {
        let dir = temp_dir();
        {
            let store: FileStore<Row> = FileStore::open(&dir, "rows").await?;
            store.create(row(1, "a")).await?;
            store.create(row(2, "b")).await?;
            store.update_by_id(2, row(2, "bb")).await?;
            store.delete_by_id(1).await?;
        }

        let reopened: FileStore<Row> = FileStore::open(&dir, "rows").await?;
        let rows = reopened.find_all(Order::Ascending, None).await?;
        assert_eq!(rows, vec![row(2, "bb")]);

        let _ = std::fs::remove_dir_all(&dir);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_write_does_not_touch_file() -> Result<()> {
        let dir = temp_dir();
        let store: FileStore<Row> = FileStore::open(&dir, "rows").await?;
        store.create(row(1, "a")).await?;
        let before = std::fs::read(store.path()).map_err(|e| Error::Storage(e.to_string()))?;

        assert!(store.create(row(1, "dup")).await.is_err());
        let after = std::fs::read(store.path()).map_err(|e| Error::Storage(e.to_string()))?;
        assert_eq!(before, after);

        let _ = std::fs::remove_dir_all(&dir);
        Ok(())
    }

    /// A directory at the temp path makes every snapshot write fail
    fn block_writes(store: &FileStore<Row>) -> PathBuf {
        let tmp = store.path().with_extension("json.tmp");
        std::fs::create_dir_all(&tmp).expect("create blocking dir");
        tmp
    }

    #[tokio::test]
    async fn test_unwritable_snapshot_rolls_back_cache() -> Result<()> {
        let dir = temp_dir();
        let store: FileStore<Row> = FileStore::open(&dir, "rows").await?;
        store.create(row(1, "a")).await?;
        store.create(row(2, "b")).await?;
        let blocker = block_writes(&store);

        assert!(matches!(store.create(row(3, "c")).await, Err(Error::Storage(_))));
        assert_eq!(store.find_by_id(3).await?, None);

        assert!(store.update_by_id(1, row(1, "z")).await.is_err());
        assert_eq!(store.find_by_id(1).await?, Some(row(1, "a")));

        assert!(store.update_by_id(2, row(5, "b")).await.is_err());
        assert_eq!(store.find_by_id(2).await?, Some(row(2, "b")));
        assert_eq!(store.find_by_id(5).await?, None);

        assert!(store.delete_by_id(1).await.is_err());
        assert_eq!(store.find_by_id(1).await?, Some(row(1, "a")));

        std::fs::remove_dir_all(&blocker).expect("remove blocking dir");
        let reopened: FileStore<Row> = FileStore::open(&dir, "rows").await?;
        assert_eq!(
            reopened.find_all(Order::Ascending, None).await?,
            store.find_all(Order::Ascending, None).await?
        );

        let _ = std::fs::remove_dir_all(&dir);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_insert_does_not_consume_an_id() -> Result<()> {
        let dir = temp_dir();
        let store = Arc::new(FileStore::<Row>::open(&dir, "rows").await?);
        let table = Table::new(store.clone());
        table.insert(row(0, "a")).await?;

        let blocker = block_writes(&store);
        assert!(table.insert(row(0, "b")).await.is_err());
        assert_eq!(table.next_id().await?, 2);

        std::fs::remove_dir_all(&blocker).expect("remove blocking dir");
        assert_eq!(table.insert(row(0, "b")).await?.id, 2);

        let _ = std::fs::remove_dir_all(&dir);
        Ok(())
    }
}
