//! Publishers, their books and book cart orders

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{optional_data_url, string_or_number, JPEG_MIME};
use crate::sequence::ScopedRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publisher {
    pub id: u32,
    pub publisher_name: String,
    pub publisher_email: String,
    #[serde(deserialize_with = "string_or_number")]
    pub booth_number: String,
    #[serde(default, with = "super::blob")]
    pub logo: Option<Vec<u8>>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublisherView {
    pub id: u32,
    pub publisher_name: String,
    pub publisher_email: String,
    pub booth_number: String,
    pub logo: Option<String>,
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub books: Option<Vec<Book>>,
}

impl Publisher {
    pub fn view(&self, books: Option<Vec<Book>>) -> PublisherView {
        PublisherView {
            id: self.id,
            publisher_name: self.publisher_name.clone(),
            publisher_email: self.publisher_email.clone(),
            booth_number: self.booth_number.clone(),
            logo: optional_data_url(JPEG_MIME, &self.logo),
            logo_url: self.logo_url.clone(),
            books,
        }
    }
}

/// A title listed by one publisher
///
/// `id` is dense over the whole table, `index` is dense among the books of
/// `publisher_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub index: u32,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default)]
    pub publisher_id: u32,
}

impl Book {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            id: 0,
            index: 0,
            title: title.into(),
            publisher_id: 0,
        }
    }
}

impl ScopedRecord for Book {
    fn scope(&self) -> u32 {
        self.publisher_id
    }

    fn set_scope(&mut self, scope: u32) {
        self.publisher_id = scope;
    }

    fn index(&self) -> u32 {
        self.index
    }

    fn set_index(&mut self, index: u32) {
        self.index = index;
    }
}

/// A visitor's book order addressed to one publisher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartOrder {
    pub id: u32,
    pub user_name: String,
    pub user_email: String,
    /// Free-form list of ordered books, stored as submitted
    pub books: serde_json::Value,
    #[serde(deserialize_with = "string_or_number")]
    pub booth_number: String,
    pub publisher_id: u32,
    pub created_at: DateTime<Utc>,
}

impl CartOrder {
    /// Book titles for notifications and CSV export
    pub fn book_titles(&self) -> Vec<String> {
        match &self.books {
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Object(map) => map
                        .get("title")
                        .or_else(|| map.get("name"))
                        .and_then(|v| v.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| item.to_string()),
                    other => other.to_string(),
                })
                .collect(),
            serde_json::Value::Null => Vec::new(),
            other => vec![other.to_string()],
        }
    }
}

super::impl_record!(Publisher, Book, CartOrder);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_book_accepts_name_alias() {
        let book: Book = serde_json::from_value(json!({ "name": "Dune" })).unwrap();
        assert_eq!(book, Book::titled("Dune"));
    }

    #[test]
    fn test_book_titles_from_mixed_payloads() {
        let order = CartOrder {
            id: 1,
            user_name: "Ana".to_string(),
            user_email: "ana@example.com".to_string(),
            books: json!(["Dune", { "title": "Emma" }, { "name": "Ulysses" }]),
            booth_number: "12".to_string(),
            publisher_id: 1,
            created_at: Utc::now(),
        };
        assert_eq!(order.book_titles(), vec!["Dune", "Emma", "Ulysses"]);
    }

    #[test]
    fn test_publisher_view_omits_books_when_not_loaded() {
        let publisher = Publisher {
            id: 1,
            publisher_name: "Acme".to_string(),
            publisher_email: "books@acme.test".to_string(),
            booth_number: "7".to_string(),
            logo: None,
            logo_url: None,
        };
        let json = serde_json::to_value(publisher.view(None)).unwrap();
        assert!(json.get("books").is_none());
        let json = serde_json::to_value(publisher.view(Some(vec![]))).unwrap();
        assert_eq!(json["books"], json!([]));
    }
}
