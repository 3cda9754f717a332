//! Record store trait

use crate::error::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// A row keyed by a positive integer id.
///
/// The payload is opaque to the store and to the sequence allocator; they
/// only ever read and write the id.
pub trait Record: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    fn id(&self) -> u32;
    fn set_id(&mut self, id: u32);
}

/// Ordering of full-table reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

/// Row predicate applied by `find_all`
pub type Filter<'a, R> = &'a (dyn Fn(&R) -> bool + Send + Sync);

/// Record store trait
///
/// Five operations, each an independent read or write. Nothing here is
/// atomic across calls; callers that need that hold the table lock in
/// [`crate::sequence::Table`].
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// Table name, used in errors and logs
    fn table(&self) -> &str;

    /// Insert a new row. Fails with `Conflict` if the id is taken.
    async fn create(&self, record: R) -> Result<R>;

    async fn find_by_id(&self, id: u32) -> Result<Option<R>>;

    /// All rows ordered by id, optionally filtered
    async fn find_all(&self, order: Order, filter: Option<Filter<'_, R>>) -> Result<Vec<R>>;

    /// Replace the row stored under `id` with `record`.
    ///
    /// `record.id()` may differ from `id`; the row then moves. Fails with
    /// `NotFound` if `id` is absent and `Conflict` if the new id is taken.
    async fn update_by_id(&self, id: u32, record: R) -> Result<R>;

    /// Remove a row. Fails with `NotFound` if absent.
    async fn delete_by_id(&self, id: u32) -> Result<R>;

    /// First row in the given order
    async fn find_first(&self, order: Order) -> Result<Option<R>> {
        Ok(self.find_all(order, None).await?.into_iter().next())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.find_all(Order::Ascending, None).await?.len())
    }
}
