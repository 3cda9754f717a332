//! In-memory record store
//!
//! Rows live in an ordered map keyed by id. Used directly in tests and as
//! the cache underneath [`super::FileStore`].

use crate::error::{Error, Result};
use crate::storage::engine::{Filter, Order, Record, RecordStore};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// In-memory record store
#[derive(Clone)]
pub struct MemoryStore<R> {
    table: String,
    rows: Arc<RwLock<BTreeMap<u32, R>>>,
}

impl<R: Record> MemoryStore<R> {
    /// Create an empty store for the named table
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            rows: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Build a store from existing rows. Fails on duplicate or zero ids.
    pub fn from_rows(table: impl Into<String>, rows: Vec<R>) -> Result<Self> {
        let table = table.into();
        let mut map = BTreeMap::new();
        for row in rows {
            let id = row.id();
            if id == 0 {
                return Err(Error::Storage(format!("{}: row with id 0", table)));
            }
            if map.insert(id, row).is_some() {
                return Err(Error::Storage(format!("{}: duplicate id {}", table, id)));
            }
        }
        Ok(Self {
            table,
            rows: Arc::new(RwLock::new(map)),
        })
    }

    /// Get the number of rows stored
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Snapshot of all rows in ascending id order
    pub fn snapshot(&self) -> Vec<R> {
        self.rows.read().values().cloned().collect()
    }

    fn not_found(&self, id: u32) -> Error {
        Error::NotFound(format!("{} #{}", self.table, id))
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for MemoryStore<R> {
    fn table(&self) -> &str {
        &self.table
    }

    async fn create(&self, record: R) -> Result<R> {
        let id = record.id();
        if id == 0 {
            return Err(Error::InvalidArgument(format!(
                "{}: ids start at 1",
                self.table
            )));
        }
        let mut rows = self.rows.write();
        if rows.contains_key(&id) {
            return Err(Error::Conflict(format!(
                "{} #{} already exists",
                self.table, id
            )));
        }
        rows.insert(id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: u32) -> Result<Option<R>> {
        Ok(self.rows.read().get(&id).cloned())
    }

    async fn find_all(&self, order: Order, filter: Option<Filter<'_, R>>) -> Result<Vec<R>> {
        let rows = self.rows.read();
        let keep = |r: &&R| filter.map_or(true, |f| f(*r));
        let out = match order {
            Order::Ascending => rows.values().filter(keep).cloned().collect(),
            Order::Descending => rows.values().rev().filter(keep).cloned().collect(),
        };
        Ok(out)
    }

    async fn update_by_id(&self, id: u32, record: R) -> Result<R> {
        let new_id = record.id();
        if new_id == 0 {
            return Err(Error::InvalidArgument(format!(
                "{}: ids start at 1",
                self.table
            )));
        }
        let mut rows = self.rows.write();
        if !rows.contains_key(&id) {
            return Err(self.not_found(id));
        }
        if new_id != id && rows.contains_key(&new_id) {
            return Err(Error::Conflict(format!(
                "{} #{} already exists",
                self.table, new_id
            )));
        }
        rows.remove(&id);
        rows.insert(new_id, record.clone());
        Ok(record)
    }

    async fn delete_by_id(&self, id: u32) -> Result<R> {
        self.rows.write().remove(&id).ok_or_else(|| self.not_found(id))
    }

    async fn find_first(&self, order: Order) -> Result<Option<R>> {
        let rows = self.rows.read();
        let first = match order {
            Order::Ascending => rows.values().next(),
            Order::Descending => rows.values().next_back(),
        };
        Ok(first.cloned())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.len())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub(crate) struct Row {
        pub id: u32,
        pub name: String,
    }

    impl Record for Row {
        fn id(&self) -> u32 {
            self.id
        }

        fn set_id(&mut self, id: u32) {
            self.id = id;
        }
    }

    pub(crate) fn row(id: u32, name: &str) -> Row {
        Row {
            id,
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_memory_store_basic_ops() -> Result<()> {
        let store = MemoryStore::new("rows");

        store.create(row(1, "a")).await?;
        assert_eq!(store.find_by_id(1).await?, Some(row(1, "a")));

        store.update_by_id(1, row(1, "b")).await?;
        assert_eq!(store.find_by_id(1).await?, Some(row(1, "b")));

        store.delete_by_id(1).await?;
        assert_eq!(store.find_by_id(1).await?, None);
        assert!(store.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_duplicate_conflicts() -> Result<()> {
        let store = MemoryStore::new("rows");
        store.create(row(1, "a")).await?;
        let err = store.create(row(1, "b")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(store.find_by_id(1).await?, Some(row(1, "a")));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_moves_row_and_rejects_taken_id() -> Result<()> {
        let store = MemoryStore::new("rows");
        store.create(row(1, "a")).await?;
        store.create(row(3, "c")).await?;

        store.update_by_id(3, row(2, "c")).await?;
        assert_eq!(store.find_by_id(3).await?, None);
        assert_eq!(store.find_by_id(2).await?, Some(row(2, "c")));

        let err = store.update_by_id(2, row(1, "c")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let err = store.update_by_id(9, row(9, "x")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_find_all_order_and_filter() -> Result<()> {
        let store = MemoryStore::new("rows");
        for (id, name) in [(2, "b"), (1, "a"), (3, "c")] {
            store.create(row(id, name)).await?;
        }

        let desc = store.find_all(Order::Descending, None).await?;
        let ids: Vec<u32> = desc.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        let not_b = |r: &Row| r.name != "b";
        let filtered = store.find_all(Order::Ascending, Some(&not_b)).await?;
        let ids: Vec<u32> = filtered.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);

        assert_eq!(store.find_first(Order::Descending).await?, Some(row(3, "c")));
        Ok(())
    }

    #[test]
    fn test_from_rows_rejects_duplicates() {
        let result = MemoryStore::from_rows("rows", vec![row(1, "a"), row(1, "b")]);
        assert!(matches!(result, Err(Error::Storage(_))));
    }
}
