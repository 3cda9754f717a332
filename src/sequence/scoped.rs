//! Scoped indices
//!
//! A child table (books under publishers) carries two dense counters: the
//! table-wide `id` and an `index` that runs `1..=M` among the children of
//! one parent. Both are maintained here on top of [`TableGuard`].

use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::storage::{Order, Record};

use super::{Compaction, Renumbering, TableGuard};

/// A record that belongs to a parent and has a position among its siblings
pub trait ScopedRecord: Record {
    /// Parent foreign key
    fn scope(&self) -> u32;
    fn set_scope(&mut self, scope: u32);
    fn index(&self) -> u32;
    fn set_index(&mut self, index: u32);
}

impl<'a, R: ScopedRecord> TableGuard<'a, R> {
    /// `max(index among the parent's children) + 1`, or `1`
    pub async fn next_index(&self, scope: u32) -> Result<u32> {
        let in_scope = move |r: &R| r.scope() == scope;
        let siblings = self.list(Order::Ascending, Some(&in_scope)).await?;
        Ok(siblings.iter().map(ScopedRecord::index).max().map_or(1, |m| m + 1))
    }

    /// Create a child with the next global id and the next scoped index
    #[instrument(skip(self, child), fields(table = %self.name()))]
    pub async fn add_child(&self, scope: u32, mut child: R) -> Result<R> {
        let index = self.next_index(scope).await?;
        child.set_scope(scope);
        child.set_index(index);
        self.insert(child).await
    }

    /// Create several children in order, indices continuing from the
    /// parent's current maximum
    pub async fn add_children(&self, scope: u32, children: Vec<R>) -> Result<Vec<R>> {
        let mut created = Vec::with_capacity(children.len());
        for child in children {
            created.push(self.add_child(scope, child).await?);
        }
        Ok(created)
    }

    /// Children of one parent, ordered by index
    pub async fn children(&self, scope: u32) -> Result<Vec<R>> {
        let in_scope = move |r: &R| r.scope() == scope;
        let mut children = self.list(Order::Ascending, Some(&in_scope)).await?;
        children.sort_by_key(ScopedRecord::index);
        Ok(children)
    }

    /// Delete a child, recompact the table-wide ids, then recompact the
    /// indices of the parent it belonged to.
    #[instrument(skip(self), fields(table = %self.name()))]
    pub async fn delete_child(&self, id: u32) -> Result<Compaction<R>> {
        let compaction = self.delete(id).await?;
        let scope = compaction.removed.scope();
        let reindexed = self.reindex(scope).await?;
        info!(id, scope, reindexed, "Deleted child");
        Ok(compaction)
    }

    /// Renumber `index` to `1..=M` among one parent's children, ordered by
    /// id. Returns the number of rows written.
    pub async fn reindex(&self, scope: u32) -> Result<usize> {
        let in_scope = move |r: &R| r.scope() == scope;
        let siblings = self.list(Order::Ascending, Some(&in_scope)).await?;
        let pending: Vec<(u32, R)> = siblings
            .into_iter()
            .enumerate()
            .filter_map(|(i, child)| {
                let position = i as u32 + 1;
                (child.index() != position).then_some((position, child))
            })
            .collect();

        let total = pending.len();
        for (completed, (position, mut child)) in pending.into_iter().enumerate() {
            child.set_index(position);
            let id = child.id();
            if let Err(cause) = self.store().update_by_id(id, child).await {
                return Err(Error::PartialCompaction {
                    table: format!("{} (scope {})", self.name(), scope),
                    completed,
                    total,
                    cause: Box::new(cause),
                });
            }
        }
        Ok(total)
    }

    /// Point children at their parent's new id after the parent table was
    /// compacted. Children of a removed parent are left untouched.
    pub async fn follow_parent(&self, parents: &Renumbering) -> Result<usize> {
        if parents.is_identity() {
            return Ok(0);
        }
        let moved = |r: &R| matches!(parents.resolve(r.scope()), Some(new) if new != r.scope());
        self.rewrite_where(&moved, |child| match parents.resolve(child.scope()) {
            Some(new) => {
                child.set_scope(new);
                true
            }
            None => false,
        })
        .await
    }
}
