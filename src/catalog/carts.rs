use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use tracing::instrument;

use super::{non_empty, required, Catalog};
use crate::error::{Error, Result};
use crate::model::publisher::PublisherView;
use crate::model::{CartOrder, Publisher};
use crate::sequence::{Renumbering, TableGuard};
use crate::storage::Order;

#[derive(Debug, Clone)]
pub struct NewCartOrder {
    pub user_name: String,
    pub user_email: String,
    pub books: serde_json::Value,
    pub booth_number: String,
    pub publisher_id: u32,
}

#[derive(Debug, Clone, Default)]
pub struct CartOrderPatch {
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub books: Option<serde_json::Value>,
    pub booth_number: Option<String>,
}

/// An order with the publisher it is addressed to
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartOrderView {
    #[serde(flatten)]
    pub order: CartOrder,
    pub publisher: Option<PublisherView>,
}

impl CartOrderView {
    pub fn new(order: CartOrder, publisher: Option<&Publisher>) -> Self {
        Self {
            order,
            publisher: publisher.map(|p| p.view(None)),
        }
    }
}

impl Catalog {
    /// Store an order for an existing publisher. Nothing is stored when
    /// the publisher is missing.
    #[instrument(skip(self, new), fields(publisher_id = new.publisher_id))]
    pub async fn create_order(&self, new: NewCartOrder) -> Result<(CartOrder, Publisher)> {
        let publishers = self.publishers.lock().await;
        let orders = self.carts.lock().await;

        let publisher = match publishers.store().find_by_id(new.publisher_id).await? {
            Some(p) => p,
            None => return Err(Error::NotFound("Publisher not found".to_string())),
        };
        let order = orders
            .insert(CartOrder {
                id: 0,
                user_name: required(new.user_name, "userName")?,
                user_email: required(new.user_email, "userEmail")?,
                books: new.books,
                booth_number: new.booth_number,
                publisher_id: publisher.id,
                created_at: Utc::now(),
            })
            .await?;
        Ok((order, publisher))
    }

    /// Orders in id order, each with its publisher if it still exists
    pub async fn orders_with_publishers(&self) -> Result<Vec<(CartOrder, Option<Publisher>)>> {
        let publishers = self.publishers.lock().await;
        let orders = self.carts.lock().await;

        let by_id: HashMap<u32, Publisher> = publishers
            .list(Order::Ascending, None)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        Ok(orders
            .list(Order::Ascending, None)
            .await?
            .into_iter()
            .map(|o| {
                let publisher = by_id.get(&o.publisher_id).cloned();
                (o, publisher)
            })
            .collect())
    }

    pub async fn order(&self, id: u32) -> Result<(CartOrder, Option<Publisher>)> {
        let order = self.carts.get(id).await?;
        let publisher = self.publishers.store().find_by_id(order.publisher_id).await?;
        Ok((order, publisher))
    }

    pub async fn update_order(&self, id: u32, patch: CartOrderPatch) -> Result<CartOrder> {
        self.carts
            .update(id, move |order| {
                if let Some(name) = non_empty(patch.user_name) {
                    order.user_name = name;
                }
                if let Some(email) = non_empty(patch.user_email) {
                    order.user_email = email;
                }
                if let Some(books) = patch.books.filter(|b| !b.is_null()) {
                    order.books = books;
                }
                if let Some(booth) = non_empty(patch.booth_number) {
                    order.booth_number = booth;
                }
            })
            .await
    }

    /// Remove without renumbering other orders
    pub async fn delete_order(&self, id: u32) -> Result<CartOrder> {
        self.carts.lock().await.remove(id).await
    }
}

/// Point orders at their publisher's new id
pub(crate) async fn follow_publishers(
    orders: &TableGuard<'_, CartOrder>,
    publishers: &Renumbering,
) -> Result<usize> {
    if publishers.is_identity() {
        return Ok(0);
    }
    let moved = |o: &CartOrder| {
        matches!(publishers.resolve(o.publisher_id), Some(new) if new != o.publisher_id)
    };
    orders
        .rewrite_where(&moved, |order| match publishers.resolve(order.publisher_id) {
            Some(new) => {
                order.publisher_id = new;
                true
            }
            None => false,
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NewPublisher;
    use serde_json::json;

    fn order(publisher_id: u32) -> NewCartOrder {
        NewCartOrder {
            user_name: "Ana".to_string(),
            user_email: "ana@example.com".to_string(),
            books: json!(["Dune"]),
            booth_number: "4".to_string(),
            publisher_id,
        }
    }

    async fn with_publishers(n: usize) -> Result<Catalog> {
        let catalog = Catalog::in_memory().await?;
        for i in 0..n {
            catalog
                .create_publisher(NewPublisher {
                    publisher_name: format!("p{}", i + 1),
                    publisher_email: format!("p{}@pub.test", i + 1),
                    booth_number: i.to_string(),
                    ..Default::default()
                })
                .await?;
        }
        Ok(catalog)
    }

    #[tokio::test]
    async fn test_order_for_missing_publisher_stores_nothing() -> Result<()> {
        let catalog = with_publishers(0).await?;
        let err = catalog.create_order(order(3)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(catalog.orders_with_publishers().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_publisher_with_orders_cannot_be_deleted() -> Result<()> {
        let catalog = with_publishers(2).await?;
        catalog.create_order(order(2)).await?;
        let err = catalog.delete_publisher(2).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(catalog.publisher(2).await?.0.publisher_name, "p2");
        Ok(())
    }

    #[tokio::test]
    async fn test_orders_follow_publisher_renumbering() -> Result<()> {
        let catalog = with_publishers(3).await?;
        catalog.create_order(order(3)).await?;
        catalog.delete_publisher(1).await?;

        let (order, publisher) = catalog.order(1).await?;
        assert_eq!(order.publisher_id, 2);
        assert_eq!(publisher.map(|p| p.publisher_name), Some("p3".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_deleted_order_leaves_a_gap_without_flagging() -> Result<()> {
        let catalog = with_publishers(1).await?;
        catalog.create_order(order(1)).await?;
        catalog.create_order(order(1)).await?;
        catalog.delete_order(1).await?;

        let (kept, _) = catalog.order(2).await?;
        assert_eq!(kept.id, 2);
        let report = catalog.verify().await?;
        assert!(report.iter().all(|d| d.table != "cart"));
        assert!(report.iter().all(|d| d.dense && !d.needs_repair));
        assert!(catalog.tables_needing_repair().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_view_embeds_publisher() -> Result<()> {
        let catalog = with_publishers(1).await?;
        let (order, publisher) = catalog.create_order(order(1)).await?;
        let json = serde_json::to_value(CartOrderView::new(order, Some(&publisher))).unwrap();
        assert_eq!(json["userName"], "Ana");
        assert_eq!(json["publisher"]["publisherName"], "p1");
        Ok(())
    }
}
