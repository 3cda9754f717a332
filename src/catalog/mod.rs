//! Book fair catalog
//!
//! One [`Table`] per entity plus the operations the REST layer exposes.
//! Operations that cascade across tables take the table locks parent
//! first:
//!
//! ```text
//! publishers ─→ books ─→ cart
//! speakers   ─→ events
//! ```
//!
//! Users, team members, about-event entries and cart orders get ids from
//! the allocator but are removed without renumbering the survivors. Every
//! other table is compacted after a delete, and only those are checked for
//! density and accepted by [`Catalog::repair`].

pub mod about;
pub mod banners;
pub mod carts;
pub mod events;
pub mod gallery;
pub mod publishers;
pub mod speakers;
pub mod teams;
pub mod users;

pub use about::{AboutEventPatch, NewAboutEvent};
pub use banners::{BannerPatch, NewBanner};
pub use carts::{CartOrderPatch, CartOrderView, NewCartOrder};
pub use events::{EventPatch, NewEvent};
pub use publishers::{NewPublisher, PublisherPatch};
pub use speakers::{NewSpeaker, SpeakerPatch};
pub use teams::NewTeamMember;

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::model::{
    AboutEvent, Banner, Book, CartOrder, Event, GalleryImage, PartnerImage, Publisher, Speaker,
    TeamMember, User,
};
use crate::sequence::{Density, ManagedTable, Renumbering, Table};
use crate::storage::{FileStore, MemoryStore, Record, RecordStore};

pub struct Catalog {
    pub users: Table<User>,
    pub speakers: Table<Speaker>,
    pub events: Table<Event>,
    pub banners: Table<Banner>,
    pub publishers: Table<Publisher>,
    pub books: Table<Book>,
    pub gallery: Table<GalleryImage>,
    pub partners: Table<PartnerImage>,
    pub teams: Table<TeamMember>,
    pub about: Table<AboutEvent>,
    pub carts: Table<CartOrder>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.tables().iter().map(|t| t.name()))
            .finish()
    }
}

/// Source of one store per table
#[async_trait::async_trait]
pub trait Backend {
    async fn store<R: Record>(&self, table: &str) -> Result<Arc<dyn RecordStore<R>>>;
}

struct InMemory;

#[async_trait::async_trait]
impl Backend for InMemory {
    async fn store<R: Record>(&self, table: &str) -> Result<Arc<dyn RecordStore<R>>> {
        Ok(Arc::new(MemoryStore::new(table)))
    }
}

struct OnDisk<'a>(&'a Path);

#[async_trait::async_trait]
impl Backend for OnDisk<'_> {
    async fn store<R: Record>(&self, table: &str) -> Result<Arc<dyn RecordStore<R>>> {
        Ok(Arc::new(FileStore::open(self.0, table).await?))
    }
}

impl Catalog {
    /// Volatile catalog, used by tests and `--data-dir` less runs
    pub async fn in_memory() -> Result<Self> {
        Self::with_backend(&InMemory).await
    }

    /// Open every table under `data_dir`
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = data_dir.as_ref();
        let catalog = Self::with_backend(&OnDisk(dir)).await?;
        info!(dir = %dir.display(), "Catalog opened");
        Ok(catalog)
    }

    /// Build every table, then flag compacting tables whose stored ids
    /// already have gaps
    pub async fn with_backend(backend: &(impl Backend + Sync)) -> Result<Self> {
        let catalog = Self {
            users: Table::append_only(backend.store("users").await?),
            speakers: Table::new(backend.store("speakers").await?),
            events: Table::new(backend.store("events").await?),
            banners: Table::new(backend.store("banners").await?),
            publishers: Table::new(backend.store("publishers").await?),
            books: Table::new(backend.store("books").await?),
            gallery: Table::new(backend.store("gallery").await?),
            partners: Table::new(backend.store("partners").await?),
            teams: Table::append_only(backend.store("teams").await?),
            about: Table::append_only(backend.store("about_events").await?),
            carts: Table::append_only(backend.store("cart").await?),
        };
        catalog.verify().await?;
        Ok(catalog)
    }

    pub fn tables(&self) -> Vec<&dyn ManagedTable> {
        vec![
            &self.users,
            &self.speakers,
            &self.events,
            &self.banners,
            &self.publishers,
            &self.books,
            &self.gallery,
            &self.partners,
            &self.teams,
            &self.about,
            &self.carts,
        ]
    }

    pub fn table(&self, name: &str) -> Result<&dyn ManagedTable> {
        self.tables()
            .into_iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| Error::NotFound(format!("table '{}'", name)))
    }

    /// Tables flagged by a failed compaction
    pub fn tables_needing_repair(&self) -> Vec<String> {
        self.tables()
            .into_iter()
            .filter(|t| t.needs_repair())
            .map(|t| t.name().to_string())
            .collect()
    }

    /// Names of the tables [`Catalog::repair`] accepts
    pub fn repair_targets(&self) -> Vec<&str> {
        self.tables()
            .into_iter()
            .filter(|t| t.compacts())
            .map(|t| t.name())
            .collect()
    }

    /// Density of every compacting table. Tables with gaps are flagged.
    pub async fn verify(&self) -> Result<Vec<Density>> {
        let mut report = Vec::new();
        for table in self.tables().into_iter().filter(|t| t.compacts()) {
            let density = table.verify().await?;
            if !density.dense {
                warn!(table = %density.table, rows = density.rows, max_id = density.max_id, "Table ids are not dense, flagged for repair");
            }
            report.push(density);
        }
        Ok(report)
    }

    /// Recompact one table. Parent tables carry their renumbering into
    /// the children that reference them.
    pub async fn repair(&self, name: &str) -> Result<Renumbering> {
        match name {
            "speakers" => self.repair_speakers().await,
            "publishers" => self.repair_publishers().await,
            "books" => self.repair_books().await,
            _ => match self.tables().into_iter().find(|t| t.name() == name) {
                Some(table) if table.compacts() => table.repair().await,
                Some(_) => Err(Error::InvalidArgument(format!(
                    "'{}' is never compacted; repairable tables: {}",
                    name,
                    self.repair_targets().join(", ")
                ))),
                None => Err(Error::NotFound(format!(
                    "table '{}'; repairable tables: {}",
                    name,
                    self.repair_targets().join(", ")
                ))),
            },
        }
    }
}

/// Partial updates ignore absent and empty strings
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Require a non-empty field on create
pub(crate) fn required(value: String, field: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{} is required", field)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_catalog_starts_dense_and_empty() -> Result<()> {
        let catalog = Catalog::in_memory().await?;
        let report = catalog.verify().await?;
        assert_eq!(report.len(), 7);
        assert!(report.iter().all(|d| d.compacts && d.dense && d.rows == 0));
        assert!(catalog.tables_needing_repair().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_table_is_not_found() -> Result<()> {
        let catalog = Catalog::in_memory().await?;
        match catalog.repair("nope").await {
            Err(Error::NotFound(message)) => assert!(message.contains("speakers, events")),
            other => panic!("Expected NotFound, got {:?}", other),
        }
        assert!(catalog.table("about_events").is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_repair_targets_are_the_compacting_tables() -> Result<()> {
        let catalog = Catalog::in_memory().await?;
        assert_eq!(
            catalog.repair_targets(),
            vec!["speakers", "events", "banners", "publishers", "books", "gallery", "partners"]
        );
        for name in ["users", "teams", "about_events", "cart"] {
            let err = catalog.repair(name).await.unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "{}", name);
        }
        Ok(())
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some("x".to_string())), Some("x".to_string()));
        assert!(required(String::new(), "name").is_err());
    }
}
