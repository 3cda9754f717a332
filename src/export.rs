//! CSV export

use serde::Serialize;
use std::io::Write;

use crate::error::{Error, Result};
use crate::model::{CartOrder, Publisher};
use crate::sequence::ManagedTable;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderRow<'a> {
    id: u32,
    user_name: &'a str,
    user_email: &'a str,
    booth_number: &'a str,
    publisher_id: u32,
    publisher_name: &'a str,
    books: String,
    created_at: String,
}

#[derive(Serialize)]
struct IdRow<'a> {
    table: &'a str,
    position: usize,
    id: u32,
    gap: bool,
}

fn csv_error(e: csv::Error) -> Error {
    Error::SerializationError(e.to_string())
}

/// One line per order, book titles joined with `; `
pub fn write_orders<W: Write>(
    writer: W,
    orders: &[(CartOrder, Option<Publisher>)],
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for (order, publisher) in orders {
        csv.serialize(OrderRow {
            id: order.id,
            user_name: &order.user_name,
            user_email: &order.user_email,
            booth_number: &order.booth_number,
            publisher_id: order.publisher_id,
            publisher_name: publisher.as_ref().map_or("", |p| p.publisher_name.as_str()),
            books: order.book_titles().join("; "),
            created_at: order.created_at.to_rfc3339(),
        })
        .map_err(csv_error)?;
    }
    csv.flush().map_err(|e| Error::Storage(e.to_string()))
}

pub fn orders_to_string(orders: &[(CartOrder, Option<Publisher>)]) -> Result<String> {
    let mut buf = Vec::new();
    write_orders(&mut buf, orders)?;
    String::from_utf8(buf).map_err(|e| Error::SerializationError(e.to_string()))
}

/// Id listing for one table; `gap` marks ids that are not their position
pub async fn write_ids<W: Write>(writer: W, table: &dyn ManagedTable) -> Result<()> {
    let ids = table.ids().await?;
    let mut csv = csv::Writer::from_writer(writer);
    for (i, id) in ids.into_iter().enumerate() {
        let position = i + 1;
        csv.serialize(IdRow {
            table: table.name(),
            position,
            id,
            gap: id as usize != position,
        })
        .map_err(csv_error)?;
    }
    csv.flush().map_err(|e| Error::Storage(e.to_string()))
}
