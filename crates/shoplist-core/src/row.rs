use std::fmt;

use crate::item::{ItemKey, ShoppingItem, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Header,
    Item,
    ManualItem,
    Footer,
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Header => "header",
            Self::Item => "item",
            Self::ManualItem => "manual item",
            Self::Footer => "footer",
        };
        f.write_str(label)
    }
}

/// One visual row of the grouped list.
///
/// Equality is identity: two rows are equal when they are the same kind and
/// point at the same store or the same stored entry, regardless of edits to
/// the entry's fields. Use [`Row::content_eq`] to compare field values.
#[derive(Debug, Clone)]
pub enum Row {
    Header { store: Store },
    Item { item: ShoppingItem },
    ManualItem { item: ShoppingItem },
    Footer,
}

impl Row {
    pub fn header(store: Store) -> Self {
        Self::Header { store }
    }

    pub fn for_item(item: ShoppingItem) -> Self {
        if item.is_manual() {
            Self::ManualItem { item }
        } else {
            Self::Item { item }
        }
    }

    pub fn kind(&self) -> RowKind {
        match self {
            Self::Header { .. } => RowKind::Header,
            Self::Item { .. } => RowKind::Item,
            Self::ManualItem { .. } => RowKind::ManualItem,
            Self::Footer => RowKind::Footer,
        }
    }

    pub fn is_header(&self) -> bool {
        matches!(self, Self::Header { .. })
    }

    pub fn is_footer(&self) -> bool {
        matches!(self, Self::Footer)
    }

    pub fn is_removable(&self) -> bool {
        matches!(self, Self::Item { .. } | Self::ManualItem { .. })
    }

    pub fn is_group_boundary(&self) -> bool {
        matches!(self, Self::Header { .. } | Self::Footer)
    }

    pub fn shopping_item(&self) -> Option<&ShoppingItem> {
        match self {
            Self::Item { item } | Self::ManualItem { item } => Some(item),
            Self::Header { .. } | Self::Footer => None,
        }
    }

    pub fn shopping_item_mut(&mut self) -> Option<&mut ShoppingItem> {
        match self {
            Self::Item { item } | Self::ManualItem { item } => Some(item),
            Self::Header { .. } | Self::Footer => None,
        }
    }

    pub fn item_key(&self) -> Option<ItemKey> {
        self.shopping_item().and_then(ShoppingItem::key)
    }

    pub fn header_store(&self) -> Option<&Store> {
        match self {
            Self::Header { store } => Some(store),
            _ => None,
        }
    }

    pub fn content_eq(&self, other: &Row) -> bool {
        match (self, other) {
            (Self::Header { store: left }, Self::Header { store: right }) => left == right,
            (Self::Item { item: left }, Self::Item { item: right })
            | (Self::ManualItem { item: left }, Self::ManualItem { item: right }) => left == right,
            (Self::Footer, Self::Footer) => true,
            _ => false,
        }
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Header { store: left }, Self::Header { store: right }) => left.id == right.id,
            (Self::Item { item: left }, Self::Item { item: right })
            | (Self::ManualItem { item: left }, Self::ManualItem { item: right }) => {
                left.same_entry(right)
            }
            (Self::Footer, Self::Footer) => true,
            _ => false,
        }
    }
}
