//! Publishers and their books
//!
//! Book ids are dense over the whole table; each book's `index` is dense
//! among its publisher's books. Deleting a publisher takes its books with
//! it and is refused while cart orders still point at it.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, instrument};

use super::{carts, non_empty, required, Catalog};
use crate::error::{Error, Result};
use crate::media::StoredMedia;
use crate::model::{Book, CartOrder, Publisher};
use crate::sequence::{Compaction, Renumbering};
use crate::storage::Order;

#[derive(Debug, Clone, Default)]
pub struct NewPublisher {
    pub publisher_name: String,
    pub publisher_email: String,
    pub booth_number: String,
    pub logo: Option<StoredMedia>,
    /// Titles, in listing order
    pub books: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PublisherPatch {
    pub publisher_name: Option<String>,
    pub publisher_email: Option<String>,
    pub booth_number: Option<String>,
    pub logo: Option<StoredMedia>,
}

impl Catalog {
    /// Create a publisher and its initial books (indices `1..=k`,
    /// consecutive global ids)
    #[instrument(skip(self, new), fields(name = %new.publisher_name, books = new.books.len()))]
    pub async fn create_publisher(&self, new: NewPublisher) -> Result<(Publisher, Vec<Book>)> {
        let publishers = self.publishers.lock().await;
        let books = self.books.lock().await;

        let titles = new
            .books
            .into_iter()
            .map(|t| required(t, "book title").map(Book::titled))
            .collect::<Result<Vec<_>>>()?;
        let (logo, logo_url) = new.logo.map(StoredMedia::into_parts).unwrap_or_default();

        let publisher = publishers
            .insert(Publisher {
                id: 0,
                publisher_name: required(new.publisher_name, "publisherName")?,
                publisher_email: required(new.publisher_email, "publisherEmail")?,
                booth_number: new.booth_number,
                logo,
                logo_url,
            })
            .await?;
        let created = books.add_children(publisher.id, titles).await?;
        Ok((publisher, created))
    }

    /// Every publisher with its books ordered by index
    pub async fn publishers_with_books(&self) -> Result<Vec<(Publisher, Vec<Book>)>> {
        let publishers = self.publishers.lock().await;
        let books = self.books.lock().await;

        let mut by_publisher: BTreeMap<u32, Vec<Book>> = BTreeMap::new();
        for book in books.list(Order::Ascending, None).await? {
            by_publisher.entry(book.publisher_id).or_default().push(book);
        }

        Ok(publishers
            .list(Order::Ascending, None)
            .await?
            .into_iter()
            .map(|p| {
                let mut own = by_publisher.remove(&p.id).unwrap_or_default();
                own.sort_by_key(|b| b.index);
                (p, own)
            })
            .collect())
    }

    pub async fn publisher(&self, id: u32) -> Result<(Publisher, Vec<Book>)> {
        let publishers = self.publishers.lock().await;
        let books = self.books.lock().await;
        let publisher = publishers.get(id).await?;
        let own = books.children(id).await?;
        Ok((publisher, own))
    }

    pub async fn update_publisher(&self, id: u32, patch: PublisherPatch) -> Result<Publisher> {
        self.publishers
            .update(id, move |publisher| {
                if let Some(name) = non_empty(patch.publisher_name) {
                    publisher.publisher_name = name;
                }
                if let Some(email) = non_empty(patch.publisher_email) {
                    publisher.publisher_email = email;
                }
                if let Some(booth) = non_empty(patch.booth_number) {
                    publisher.booth_number = booth;
                }
                if let Some(media) = patch.logo {
                    let (logo, logo_url) = media.into_parts();
                    publisher.logo = logo;
                    publisher.logo_url = logo_url;
                }
            })
            .await
    }

    /// Delete a publisher with its books, then compact both tables and
    /// carry the new publisher ids into books and cart orders
    #[instrument(skip(self))]
    pub async fn delete_publisher(&self, id: u32) -> Result<Compaction<Publisher>> {
        let publishers = self.publishers.lock().await;
        let books = self.books.lock().await;
        let orders = self.carts.lock().await;

        publishers.get(id).await?;
        let ordered = move |o: &CartOrder| o.publisher_id == id;
        let pending = orders.list(Order::Ascending, Some(&ordered)).await?;
        if !pending.is_empty() {
            return Err(Error::Conflict(format!(
                "Publisher {} has {} cart order(s)",
                id,
                pending.len()
            )));
        }

        let own = books.children(id).await?;
        for book in &own {
            books.remove(book.id).await?;
        }
        if !own.is_empty() {
            books.compact().await?;
        }

        let compaction = publishers.delete(id).await?;
        books.follow_parent(&compaction.renumbering).await?;
        carts::follow_publishers(&orders, &compaction.renumbering).await?;

        info!(id, books = own.len(), "Publisher deleted");
        Ok(compaction)
    }

    /// Append a book to an existing publisher
    pub async fn add_book(&self, publisher_id: u32, title: String) -> Result<Book> {
        let publishers = self.publishers.lock().await;
        let books = self.books.lock().await;

        publishers.get(publisher_id).await?;
        books
            .add_child(publisher_id, Book::titled(required(title, "name")?))
            .await
    }

    /// Delete one book, compact the book ids, and reindex its publisher's
    /// remaining books
    pub async fn delete_book(&self, publisher_id: u32, book_id: u32) -> Result<Compaction<Book>> {
        let books = self.books.lock().await;
        let book = books.get(book_id).await?;
        if book.publisher_id != publisher_id {
            return Err(Error::NotFound(format!(
                "book #{} of publisher #{}",
                book_id, publisher_id
            )));
        }
        books.delete_child(book_id).await
    }

    pub(crate) async fn repair_publishers(&self) -> Result<Renumbering> {
        let publishers = self.publishers.lock().await;
        let books = self.books.lock().await;
        let orders = self.carts.lock().await;

        let renumbering = publishers.repair().await?;
        books.follow_parent(&renumbering).await?;
        carts::follow_publishers(&orders, &renumbering).await?;
        Ok(renumbering)
    }

    pub(crate) async fn repair_books(&self) -> Result<Renumbering> {
        let books = self.books.lock().await;
        let renumbering = books.repair().await?;
        let scopes: BTreeSet<u32> = books
            .list(Order::Ascending, None)
            .await?
            .iter()
            .map(|b| b.publisher_id)
            .collect();
        for scope in scopes {
            books.reindex(scope).await?;
        }
        Ok(renumbering)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publisher(name: &str, books: &[&str]) -> NewPublisher {
        NewPublisher {
            publisher_name: name.to_string(),
            publisher_email: format!("{}@pub.test", name),
            booth_number: "1".to_string(),
            logo: None,
            books: books.iter().map(|b| b.to_string()).collect(),
        }
    }

    fn layout(books: &[Book]) -> Vec<(u32, u32, u32, &str)> {
        books
            .iter()
            .map(|b| (b.id, b.publisher_id, b.index, b.title.as_str()))
            .collect()
    }

    #[tokio::test]
    async fn test_create_assigns_ids_and_indices() -> Result<()> {
        let catalog = Catalog::in_memory().await?;
        catalog.create_publisher(publisher("a", &["a1", "a2"])).await?;
        let (p, books) = catalog.create_publisher(publisher("b", &["b1"])).await?;
        assert_eq!(p.id, 2);
        assert_eq!(layout(&books), vec![(3, 2, 1, "b1")]);

        let book = catalog.add_book(1, "a3".to_string()).await?;
        assert_eq!((book.id, book.index), (4, 3));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_book_to_missing_publisher() -> Result<()> {
        let catalog = Catalog::in_memory().await?;
        let err = catalog.add_book(1, "x".to_string()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_book_reindexes_publisher() -> Result<()> {
        let catalog = Catalog::in_memory().await?;
        catalog.create_publisher(publisher("a", &["a1", "a2", "a3"])).await?;
        catalog.create_publisher(publisher("b", &["b1"])).await?;

        let err = catalog.delete_book(2, 1).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        catalog.delete_book(1, 2).await?;
        let all = catalog.books.list(Order::Ascending, None).await?;
        assert_eq!(
            layout(&all),
            vec![(1, 1, 1, "a1"), (2, 1, 2, "a3"), (3, 2, 1, "b1")]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_publisher_cascades_to_books() -> Result<()> {
        let catalog = Catalog::in_memory().await?;
        catalog.create_publisher(publisher("a", &["a1"])).await?;
        catalog.create_publisher(publisher("b", &["b1", "b2"])).await?;
        catalog.create_publisher(publisher("c", &["c1"])).await?;

        catalog.delete_publisher(2).await?;

        let listing = catalog.publishers_with_books().await?;
        let summary: Vec<(u32, &str, Vec<(u32, u32, u32, &str)>)> = listing
            .iter()
            .map(|(p, books)| (p.id, p.publisher_name.as_str(), layout(books)))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, "a", vec![(1, 1, 1, "a1")]),
                (2, "c", vec![(2, 2, 1, "c1")]),
            ]
        );
        Ok(())
    }
}
