//! Dense sequential ids
//!
//! Every table keeps its ids contiguous: `1..=N` at any quiescent moment.
//!
//! - Insert assigns `max(id) + 1`, or `1` on an empty table.
//! - Delete removes the row, then walks the survivors in ascending id
//!   order and rewrites every row whose id is not its 1-based position.
//!
//! Both are multi-step sequences over a [`RecordStore`], so a [`Table`]
//! runs them inside a per-table async mutex. Holders of a [`TableGuard`]
//! may chain several steps (and cascade into other tables) without another
//! writer interleaving. When a cascade touches two tables the parent table
//! is always locked first.
//!
//! A renumbering pass that fails partway is not rolled back. The error is
//! reported as [`Error::PartialCompaction`] and the table is flagged until
//! [`Table::repair`] runs. [`ManagedTable::verify`] flags a compacting
//! table it finds with gaps, which is how damage left by a previous process
//! is picked up on open.
//!
//! Tables built with [`Table::append_only`] still allocate `max + 1` but
//! keep their ids on delete. Gaps there are expected and never flagged.

pub mod scoped;

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Error, Result};
use crate::metrics;
use crate::storage::{Filter, Order, Record, RecordStore};

pub use scoped::ScopedRecord;

/// Id changes produced by one compaction pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Renumbering {
    removed: Vec<u32>,
    moves: BTreeMap<u32, u32>,
}

impl Renumbering {
    fn removing(id: u32) -> Self {
        Self {
            removed: vec![id],
            moves: BTreeMap::new(),
        }
    }

    /// Where a reference to `old` points now. `None` if that row was deleted.
    pub fn resolve(&self, old: u32) -> Option<u32> {
        if self.removed.contains(&old) {
            return None;
        }
        Some(self.moves.get(&old).copied().unwrap_or(old))
    }

    /// `(old, new)` pairs in ascending order of the old id
    pub fn moves(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.moves.iter().map(|(from, to)| (*from, *to))
    }

    pub fn removed(&self) -> &[u32] {
        &self.removed
    }

    /// True when no surviving row changed id
    pub fn is_identity(&self) -> bool {
        self.moves.is_empty()
    }
}

/// Result of a delete: the removed row and how survivors moved
#[derive(Debug, Clone)]
pub struct Compaction<R> {
    pub removed: R,
    pub renumbering: Renumbering,
}

/// Density check result for one table
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Density {
    pub table: String,
    pub rows: usize,
    pub max_id: u32,
    /// Whether deletes renumber the survivors
    pub compacts: bool,
    pub dense: bool,
    pub needs_repair: bool,
}

/// `max(id) + 1`, or `1` for an empty table. Read-only.
pub async fn next_id<R: Record>(store: &dyn RecordStore<R>) -> Result<u32> {
    let last = store.find_first(Order::Descending).await?;
    Ok(last.map_or(1, |r| r.id() + 1))
}

/// Renumber every row to its 1-based position in ascending id order.
///
/// Rows already in place are not written. A failed write stops the pass and
/// is returned as [`Error::PartialCompaction`].
pub async fn compact<R: Record>(store: &dyn RecordStore<R>) -> Result<Renumbering> {
    let rows = store.find_all(Order::Ascending, None).await?;
    let pending: Vec<(u32, R)> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let position = i as u32 + 1;
            (row.id() != position).then_some((position, row))
        })
        .collect();

    let total = pending.len();
    let mut renumbering = Renumbering::default();
    for (completed, (position, mut row)) in pending.into_iter().enumerate() {
        let old = row.id();
        row.set_id(position);
        if let Err(cause) = store.update_by_id(old, row).await {
            return Err(Error::PartialCompaction {
                table: store.table().to_string(),
                completed,
                total,
                cause: Box::new(cause),
            });
        }
        renumbering.moves.insert(old, position);
    }

    if total > 0 {
        metrics::COMPACTION_MOVES
            .with_label_values(&[store.table()])
            .inc_by(total as u64);
    }
    Ok(renumbering)
}

/// Operations every table exposes regardless of its row type
#[async_trait]
pub trait ManagedTable: Send + Sync {
    fn name(&self) -> &str;

    fn needs_repair(&self) -> bool;

    fn compacts(&self) -> bool;

    /// Ids in ascending order
    async fn ids(&self) -> Result<Vec<u32>>;

    /// Density report. A compacting table with gaps is flagged for repair.
    async fn verify(&self) -> Result<Density>;

    async fn repair(&self) -> Result<Renumbering>;
}

/// A record store plus the lock that makes allocator steps atomic
pub struct Table<R: Record> {
    store: Arc<dyn RecordStore<R>>,
    lock: Mutex<()>,
    compacts: bool,
    needs_repair: AtomicBool,
}

impl<R: Record> std::fmt::Debug for Table<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.store.table())
            .field("compacts", &self.compacts)
            .field("needs_repair", &self.needs_repair())
            .finish()
    }
}

impl<R: Record> Table<R> {
    /// Table whose deletes renumber the survivors
    pub fn new(store: Arc<dyn RecordStore<R>>) -> Self {
        Self::build(store, true)
    }

    /// Table whose rows keep their ids on delete
    pub fn append_only(store: Arc<dyn RecordStore<R>>) -> Self {
        Self::build(store, false)
    }

    fn build(store: Arc<dyn RecordStore<R>>, compacts: bool) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
            compacts,
            needs_repair: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        self.store.table()
    }

    /// Underlying store, for unlocked reads
    pub fn store(&self) -> &dyn RecordStore<R> {
        self.store.as_ref()
    }

    pub fn needs_repair(&self) -> bool {
        self.needs_repair.load(Ordering::SeqCst)
    }

    pub fn compacts(&self) -> bool {
        self.compacts
    }

    /// Enter the table's critical section
    pub async fn lock(&self) -> TableGuard<'_, R> {
        TableGuard {
            table: self,
            _guard: self.lock.lock().await,
        }
    }

    /// Id the next insert would get. Takes no lock and reserves nothing.
    pub async fn next_id(&self) -> Result<u32> {
        next_id(self.store()).await
    }

    pub async fn insert(&self, record: R) -> Result<R> {
        self.lock().await.insert(record).await
    }

    pub async fn delete(&self, id: u32) -> Result<Compaction<R>> {
        self.lock().await.delete(id).await
    }

    /// Row by id, or `NotFound`
    pub async fn get(&self, id: u32) -> Result<R> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{} #{}", self.name(), id)))
    }

    pub async fn list(&self, order: Order, filter: Option<Filter<'_, R>>) -> Result<Vec<R>> {
        self.store.find_all(order, filter).await
    }

    pub async fn update(&self, id: u32, edit: impl FnOnce(&mut R) + Send) -> Result<R> {
        self.lock().await.update(id, edit).await
    }

    fn flag_for_repair(&self) {
        if !self.needs_repair.swap(true, Ordering::SeqCst) {
            metrics::TABLES_NEEDING_REPAIR.inc();
        }
    }

    fn clear_repair_flag(&self) {
        if self.needs_repair.swap(false, Ordering::SeqCst) {
            metrics::TABLES_NEEDING_REPAIR.dec();
        }
    }
}

#[async_trait]
impl<R: Record> ManagedTable for Table<R> {
    fn name(&self) -> &str {
        Table::name(self)
    }

    fn needs_repair(&self) -> bool {
        Table::needs_repair(self)
    }

    fn compacts(&self) -> bool {
        self.compacts
    }

    async fn ids(&self) -> Result<Vec<u32>> {
        let rows = self.store.find_all(Order::Ascending, None).await?;
        Ok(rows.iter().map(Record::id).collect())
    }

    async fn verify(&self) -> Result<Density> {
        let _guard = self.lock.lock().await;
        let ids = self.ids().await?;
        let dense = ids.iter().enumerate().all(|(i, id)| *id == i as u32 + 1);
        if self.compacts && !dense {
            self.flag_for_repair();
        }
        Ok(Density {
            table: self.name().to_string(),
            rows: ids.len(),
            max_id: ids.last().copied().unwrap_or(0),
            compacts: self.compacts,
            dense,
            needs_repair: Table::needs_repair(self),
        })
    }

    async fn repair(&self) -> Result<Renumbering> {
        self.lock().await.repair().await
    }
}

/// Exclusive access to one table
///
/// Everything done through a guard is atomic relative to other allocator
/// operations on the same table.
pub struct TableGuard<'a, R: Record> {
    table: &'a Table<R>,
    _guard: MutexGuard<'a, ()>,
}

impl<'a, R: Record> TableGuard<'a, R> {
    pub fn name(&self) -> &str {
        self.table.name()
    }

    pub fn store(&self) -> &dyn RecordStore<R> {
        self.table.store()
    }

    pub async fn next_id(&self) -> Result<u32> {
        next_id(self.store()).await
    }

    /// Assign the next id and create the row
    #[instrument(skip(self, record), fields(table = %self.name()))]
    pub async fn insert(&self, mut record: R) -> Result<R> {
        let id = self.next_id().await?;
        record.set_id(id);
        let created = self.store().create(record).await.map_err(|e| {
            warn!(id, error = %e, "Insert failed");
            e
        })?;
        metrics::ALLOCATOR_OPS
            .with_label_values(&[self.name(), "insert"])
            .inc();
        debug!(id, "Inserted");
        Ok(created)
    }

    /// Insert several rows with consecutive ids, in order
    pub async fn insert_many(&self, records: Vec<R>) -> Result<Vec<R>> {
        let mut created = Vec::with_capacity(records.len());
        for record in records {
            created.push(self.insert(record).await?);
        }
        Ok(created)
    }

    /// Delete a row and close the gap it leaves
    #[instrument(skip(self), fields(table = %self.name()))]
    pub async fn delete(&self, id: u32) -> Result<Compaction<R>> {
        let removed = self.store().delete_by_id(id).await?;
        let mut renumbering = Renumbering::removing(id);
        let shifted = self.compact().await?;
        renumbering.moves = shifted.moves;

        metrics::ALLOCATOR_OPS
            .with_label_values(&[self.name(), "delete"])
            .inc();
        info!(id, shifted = renumbering.moves.len(), "Deleted and compacted");
        Ok(Compaction {
            removed,
            renumbering,
        })
    }

    /// Delete a row without renumbering the survivors
    pub async fn remove(&self, id: u32) -> Result<R> {
        let removed = self.store().delete_by_id(id).await?;
        metrics::ALLOCATOR_OPS
            .with_label_values(&[self.name(), "remove"])
            .inc();
        Ok(removed)
    }

    /// Renumber survivors to `1..=N`. Flags the table on partial failure.
    pub async fn compact(&self) -> Result<Renumbering> {
        compact(self.store()).await.map_err(|e| {
            if matches!(e, Error::PartialCompaction { .. }) {
                error!(table = %self.name(), error = %e, "Compaction stopped partway, table needs repair");
                self.table.flag_for_repair();
            }
            e
        })
    }

    /// Compact and clear the repair flag. Append-only tables are refused.
    #[instrument(skip(self), fields(table = %self.name()))]
    pub async fn repair(&self) -> Result<Renumbering> {
        if !self.table.compacts {
            return Err(Error::InvalidArgument(format!(
                "'{}' keeps its ids on delete and is never compacted",
                self.name()
            )));
        }
        let renumbering = self.compact().await?;
        self.table.clear_repair_flag();
        info!(moved = renumbering.moves.len(), "Table repaired");
        Ok(renumbering)
    }

    pub async fn get(&self, id: u32) -> Result<R> {
        self.table.get(id).await
    }

    pub async fn list(&self, order: Order, filter: Option<Filter<'_, R>>) -> Result<Vec<R>> {
        self.store().find_all(order, filter).await
    }

    /// Edit a row's payload in place. The id is restored if the edit
    /// touches it.
    pub async fn update(&self, id: u32, edit: impl FnOnce(&mut R) + Send) -> Result<R> {
        let mut row = self.get(id).await?;
        edit(&mut row);
        row.set_id(id);
        self.store().update_by_id(id, row).await
    }

    /// Rewrite every row the predicate selects with `edit`, skipping rows
    /// the edit leaves unchanged. Returns the number of rows written.
    pub async fn rewrite_where(
        &self,
        filter: Filter<'_, R>,
        mut edit: impl FnMut(&mut R) -> bool + Send,
    ) -> Result<usize> {
        let rows = self.store().find_all(Order::Ascending, Some(filter)).await?;
        let mut written = 0;
        for mut row in rows {
            let id = row.id();
            if edit(&mut row) {
                row.set_id(id);
                self.store().update_by_id(id, row).await?;
                written += 1;
            }
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::tests::{row, Row};
    use crate::storage::MemoryStore;

    fn table() -> Table<Row> {
        Table::new(Arc::new(MemoryStore::new("rows")))
    }

    async fn ids(table: &Table<Row>) -> Vec<u32> {
        ManagedTable::ids(table).await.unwrap()
    }

    #[tokio::test]
    async fn test_next_id_on_empty_table_is_one() -> Result<()> {
        let table = table();
        assert_eq!(table.next_id().await?, 1);
        assert_eq!(table.next_id().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_insert_assigns_max_plus_one() -> Result<()> {
        let table = table();
        for name in ["a", "b", "c"] {
            table.insert(row(0, name)).await?;
        }
        assert_eq!(ids(&table).await, vec![1, 2, 3]);
        assert_eq!(table.get(2).await?.name, "b");
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_middle_shifts_later_rows_down() -> Result<()> {
        let table = table();
        for name in ["a", "b", "c", "d"] {
            table.insert(row(0, name)).await?;
        }

        let compaction = table.delete(2).await?;
        assert_eq!(compaction.removed.name, "b");
        assert_eq!(compaction.renumbering.resolve(1), Some(1));
        assert_eq!(compaction.renumbering.resolve(2), None);
        assert_eq!(compaction.renumbering.resolve(3), Some(2));
        assert_eq!(compaction.renumbering.resolve(4), Some(3));

        let names: Vec<String> = table
            .list(Order::Ascending, None)
            .await?
            .into_iter()
            .map(|r| format!("{}:{}", r.id, r.name))
            .collect();
        assert_eq!(names, vec!["1:a", "2:c", "3:d"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_last_row_then_insert_starts_at_one() -> Result<()> {
        let table = table();
        table.insert(row(0, "only")).await?;
        let compaction = table.delete(1).await?;
        assert!(compaction.renumbering.is_identity());
        assert!(ids(&table).await.is_empty());
        assert_eq!(table.insert(row(0, "next")).await?.id, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found_and_leaves_table() -> Result<()> {
        let table = table();
        let err = table.delete(1).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        table.insert(row(0, "a")).await?;
        table.insert(row(0, "b")).await?;
        let err = table.delete(7).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(ids(&table).await, vec![1, 2]);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_keeps_id() -> Result<()> {
        let table = table();
        table.insert(row(0, "a")).await?;
        let updated = table
            .update(1, |r| {
                r.name = "z".to_string();
                r.id = 40;
            })
            .await?;
        assert_eq!(updated, row(1, "z"));
        Ok(())
    }

    #[tokio::test]
    async fn test_repair_closes_gaps() -> Result<()> {
        let store = Arc::new(MemoryStore::from_rows(
            "rows",
            vec![row(2, "a"), row(5, "b"), row(6, "c")],
        )?);
        let table = Table::new(store);
        let density = table.verify().await?;
        assert!(!density.dense);
        assert!(density.needs_repair);

        let renumbering = table.repair().await?;
        assert_eq!(renumbering.moves().collect::<Vec<_>>(), vec![(2, 1), (5, 2), (6, 3)]);

        let density = table.verify().await?;
        assert!(density.dense);
        assert_eq!(density.max_id, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_append_only_gaps_are_not_flagged() -> Result<()> {
        let table = Table::append_only(Arc::new(MemoryStore::new("rows")));
        for name in ["a", "b", "c"] {
            table.insert(row(0, name)).await?;
        }
        table.lock().await.remove(2).await?;
        assert_eq!(table.insert(row(0, "d")).await?.id, 4);

        let density = table.verify().await?;
        assert!(!density.compacts);
        assert!(!density.dense);
        assert!(!density.needs_repair);
        assert!(!table.needs_repair());

        let err = table.repair().await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(ids(&table).await, vec![1, 3, 4]);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_inserts_stay_dense() -> Result<()> {
        let table = Arc::new(table());
        let mut handles = Vec::new();
        for i in 0..32 {
            let table = table.clone();
            handles.push(tokio::spawn(async move {
                table.insert(row(0, &format!("r{}", i))).await
            }));
        }
        for handle in handles {
            handle.await.expect("task panicked")?;
        }
        assert_eq!(ids(&table).await, (1..=32).collect::<Vec<_>>());
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_deletes_stay_dense() -> Result<()> {
        let table = Arc::new(table());
        for i in 0..20 {
            table.insert(row(0, &format!("r{}", i))).await?;
        }
        let mut handles = Vec::new();
        for _ in 0..10 {
            let table = table.clone();
            handles.push(tokio::spawn(async move { table.delete(1).await }));
        }
        for handle in handles {
            handle.await.expect("task panicked")?;
        }
        assert_eq!(ids(&table).await, (1..=10).collect::<Vec<_>>());
        Ok(())
    }
}
