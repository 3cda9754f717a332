//! A renumbering pass that fails partway is reported, flagged, and fixed by
//! an explicit repair

use async_trait::async_trait;
use bookfair::catalog::{Backend, NewSpeaker};
use bookfair::error::{Error, Result};
use bookfair::sequence::ManagedTable;
use bookfair::server::HealthChecker;
use bookfair::model::Speaker;
use bookfair::storage::{FileStore, Filter, MemoryStore, Order, Record, RecordStore};
use bookfair::Catalog;
use std::sync::atomic::{AtomicI64, Ordering};
use std::path::PathBuf;
use std::sync::Arc;

/// Shared budget of id-changing updates; negative means unlimited
#[derive(Debug)]
struct Failpoint(AtomicI64);

impl Failpoint {
    fn disarmed() -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(-1)))
    }

    fn allow(&self, updates: i64) {
        self.0.store(updates, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        let left = self.0.load(Ordering::SeqCst);
        if left < 0 {
            return true;
        }
        if left == 0 {
            return false;
        }
        self.0.store(left - 1, Ordering::SeqCst);
        true
    }
}

/// Memory store whose id-moving updates fail once the budget runs out
struct FlakyStore<R> {
    inner: MemoryStore<R>,
    failpoint: Arc<Failpoint>,
}

#[async_trait]
impl<R: Record> RecordStore<R> for FlakyStore<R> {
    fn table(&self) -> &str {
        self.inner.table()
    }

    async fn create(&self, record: R) -> Result<R> {
        self.inner.create(record).await
    }

    async fn find_by_id(&self, id: u32) -> Result<Option<R>> {
        self.inner.find_by_id(id).await
    }

    async fn find_all(&self, order: Order, filter: Option<Filter<'_, R>>) -> Result<Vec<R>> {
        self.inner.find_all(order, filter).await
    }

    async fn update_by_id(&self, id: u32, record: R) -> Result<R> {
        if record.id() != id && !self.failpoint.take() {
            return Err(Error::Storage("injected write failure".to_string()));
        }
        self.inner.update_by_id(id, record).await
    }

    async fn delete_by_id(&self, id: u32) -> Result<R> {
        self.inner.delete_by_id(id).await
    }
}

/// Speakers go through the failpoint, everything else is plain memory
struct FlakySpeakers(Arc<Failpoint>);

#[async_trait]
impl Backend for FlakySpeakers {
    async fn store<R: Record>(&self, table: &str) -> Result<Arc<dyn RecordStore<R>>> {
        if table == "speakers" {
            Ok(Arc::new(FlakyStore {
                inner: MemoryStore::new(table),
                failpoint: self.0.clone(),
            }))
        } else {
            Ok(Arc::new(MemoryStore::new(table)))
        }
    }
}

async fn catalog_with(names: &[&str]) -> (Catalog, Arc<Failpoint>) {
    let failpoint = Failpoint::disarmed();
    let catalog = Catalog::with_backend(&FlakySpeakers(failpoint.clone()))
        .await
        .expect("Failed to create catalog");
    for name in names {
        catalog
            .create_speaker(NewSpeaker {
                name: name.to_string(),
                is_active: true,
                ..Default::default()
            })
            .await
            .expect("Failed to insert");
    }
    (catalog, failpoint)
}

#[tokio::test]
async fn test_partial_compaction_is_reported_and_flagged() {
    let (catalog, failpoint) = catalog_with(&["a", "b", "c", "d", "e"]).await;

    // Deleting 1 needs four moves; allow one
    failpoint.allow(1);
    let err = catalog.delete_speaker(1).await.unwrap_err();
    match err {
        Error::PartialCompaction {
            ref table,
            completed,
            total,
            ..
        } => {
            assert_eq!(table, "speakers");
            assert_eq!((completed, total), (1, 4));
        }
        other => panic!("Expected PartialCompaction, got {:?}", other),
    }

    assert!(catalog.speakers.needs_repair());
    assert_eq!(catalog.tables_needing_repair(), vec!["speakers".to_string()]);
    assert_eq!(
        catalog.speakers.ids().await.expect("ids"),
        vec![1, 3, 4, 5]
    );

    let health = HealthChecker::new().status(&catalog);
    assert_eq!(health.status, "degraded");
    assert_eq!(health.tables_needing_repair, vec!["speakers".to_string()]);
}

#[tokio::test]
async fn test_repair_restores_density_and_clears_flag() {
    let (catalog, failpoint) = catalog_with(&["a", "b", "c", "d"]).await;

    failpoint.allow(0);
    assert!(catalog.delete_speaker(2).await.is_err());
    assert!(catalog.speakers.needs_repair());

    failpoint.allow(-1);
    let renumbering = catalog.repair("speakers").await.expect("Failed to repair");
    assert_eq!(renumbering.resolve(3), Some(2));
    assert_eq!(renumbering.resolve(4), Some(3));

    assert!(!catalog.speakers.needs_repair());
    assert!(catalog.tables_needing_repair().is_empty());
    let density = catalog.speakers.verify().await.expect("Failed to verify");
    assert!(density.dense);

    let names: Vec<String> = catalog
        .active_speakers()
        .await
        .expect("Failed to list")
        .into_iter()
        .map(|s| format!("{}:{}", s.id, s.name))
        .collect();
    assert_eq!(names, vec!["1:a", "2:c", "3:d"]);
}

#[tokio::test]
async fn test_repair_of_dense_table_is_identity() {
    let (catalog, _) = catalog_with(&["a", "b"]).await;
    let renumbering = catalog.repair("speakers").await.expect("Failed to repair");
    assert!(renumbering.is_identity());
    assert!(!catalog.speakers.needs_repair());
}

#[tokio::test]
async fn test_repair_unknown_table_is_not_found() {
    let (catalog, _) = catalog_with(&[]).await;
    let err = catalog.repair("nope").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

fn stored_speaker(id: u32, name: &str) -> Speaker {
    Speaker {
        id,
        name: name.to_string(),
        designation: None,
        note: None,
        image: None,
        image_url: None,
        is_active: true,
    }
}

fn data_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("bookfair_{}_{}", name, std::process::id()))
}

#[tokio::test]
async fn test_gaps_on_disk_are_flagged_when_opened() {
    let dir = data_dir("reopen_gaps");
    let _ = std::fs::remove_dir_all(&dir);
    {
        let store: FileStore<Speaker> = FileStore::open(&dir, "speakers")
            .await
            .expect("Failed to open store");
        store.create(stored_speaker(1, "a")).await.expect("Failed to write");
        store.create(stored_speaker(3, "c")).await.expect("Failed to write");
    }

    let catalog = Catalog::open(&dir).await.expect("Failed to open catalog");
    assert!(catalog.speakers.needs_repair());
    let health = HealthChecker::new().status(&catalog);
    assert_eq!(health.status, "degraded");
    assert_eq!(health.tables_needing_repair, vec!["speakers".to_string()]);

    let renumbering = catalog.repair("speakers").await.expect("Failed to repair");
    assert_eq!(renumbering.resolve(3), Some(2));
    drop(catalog);

    let reopened = Catalog::open(&dir).await.expect("Failed to reopen catalog");
    assert_eq!(HealthChecker::new().status(&reopened).status, "healthy");
    assert_eq!(reopened.speakers.ids().await.expect("ids"), vec![1, 2]);

    let _ = std::fs::remove_dir_all(&dir);
}
