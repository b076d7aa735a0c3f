use time::OffsetDateTime;

use crate::item::{Product, ShoppingItem, Store};
use crate::row::Row;

pub fn store(id: u64, name: &str) -> Store {
    Store::new(id, name)
}

pub fn catalog(id: u64, store: Store, title: &str) -> ShoppingItem {
    ShoppingItem::catalog(id, store, title, Product::new(id))
}

pub fn expired(id: u64, store: Store, title: &str, expires_at: OffsetDateTime) -> ShoppingItem {
    ShoppingItem::catalog(id, store, title, Product::new(id).expiring_at(expires_at))
}

pub fn manual(store: Store, title: &str) -> ShoppingItem {
    ShoppingItem::manual(store, title)
}

/// Compact rendering of a row sequence: `H<store>`, `#<id>`, `~<title>` and `F`.
pub fn keys(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .map(|row| match row {
            Row::Header { store } => format!("H{}", store.id.0),
            Row::Item { item } | Row::ManualItem { item } => match item.id {
                Some(id) => format!("#{id}"),
                None => format!("~{}", item.title),
            },
            Row::Footer => "F".to_string(),
        })
        .collect()
}
