use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

pub const DEFAULT_QUANTITY_UNIT: &str = "Items";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(pub u64);

impl StoreId {
    /// Sentinel store that collects entries not tied to a retailer.
    pub const MY_LIST: StoreId = StoreId(0);

    pub fn is_my_list(self) -> bool {
        self == Self::MY_LIST
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
}

impl Store {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: StoreId(id),
            name: name.into(),
        }
    }

    pub fn my_list() -> Self {
        Self {
            id: StoreId::MY_LIST,
            name: "My list".to_string(),
        }
    }
}

/// Catalog product backing a non-manual entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub out_of_region: bool,
}

impl Product {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            expires_at: None,
            disabled: false,
            out_of_region: false,
        }
    }

    pub fn expiring_at(mut self, expires_at: OffsetDateTime) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Available,
    Expired,
    Disabled,
    OutOfRegion,
}

impl ItemStatus {
    pub fn is_expired(self) -> bool {
        self == Self::Expired
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Expired => "expired",
            Self::Disabled => "disabled",
            Self::OutOfRegion => "out of region",
        }
    }
}

/// Identity used to correlate a row with its stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKey {
    Durable(ItemId),
    Pending(Uuid),
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Durable(id) => write!(f, "#{id}"),
            Self::Pending(uuid) => write!(f, "manual:{uuid}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_uuid: Option<Uuid>,
    pub title: String,
    pub store: Store,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default = "default_quantity_unit")]
    pub quantity_unit: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub position: u32,
}

fn default_quantity_unit() -> String {
    DEFAULT_QUANTITY_UNIT.to_string()
}

impl ShoppingItem {
    pub fn catalog(id: u64, store: Store, title: impl Into<String>, product: Product) -> Self {
        Self {
            id: Some(ItemId(id)),
            manual_uuid: None,
            title: title.into(),
            store,
            product: Some(product),
            checked: false,
            quantity: 0,
            quantity_unit: default_quantity_unit(),
            note: String::new(),
            position: 0,
        }
    }

    /// A free-text entry; its durable id is assigned later by storage.
    pub fn manual(store: Store, title: impl Into<String>) -> Self {
        Self {
            id: None,
            manual_uuid: Some(Uuid::new_v4()),
            title: title.into(),
            store,
            product: None,
            checked: false,
            quantity: 0,
            quantity_unit: default_quantity_unit(),
            note: String::new(),
            position: 0,
        }
    }

    pub fn is_manual(&self) -> bool {
        self.product.is_none()
    }

    pub fn key(&self) -> Option<ItemKey> {
        self.id
            .map(ItemKey::Durable)
            .or(self.manual_uuid.map(ItemKey::Pending))
    }

    pub fn matches_key(&self, key: &ItemKey) -> bool {
        match key {
            ItemKey::Durable(id) => self.id == Some(*id),
            ItemKey::Pending(uuid) => self.manual_uuid == Some(*uuid),
        }
    }

    /// Durable ids win; the manual UUID bridges the gap before one is assigned.
    pub fn same_entry(&self, other: &ShoppingItem) -> bool {
        match (self.id, other.id) {
            (Some(left), Some(right)) => left == right,
            _ => matches!(
                (self.manual_uuid, other.manual_uuid),
                (Some(left), Some(right)) if left == right
            ),
        }
    }

    pub fn status(&self, now: OffsetDateTime) -> ItemStatus {
        let Some(product) = &self.product else {
            return ItemStatus::Available;
        };

        if product.expires_at.is_some_and(|expires_at| expires_at <= now) {
            ItemStatus::Expired
        } else if product.disabled {
            ItemStatus::Disabled
        } else if product.out_of_region {
            ItemStatus::OutOfRegion
        } else {
            ItemStatus::Available
        }
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.status(now).is_expired()
    }

    /// How long the entry has been expired, if it has.
    pub fn expired_for(&self, now: OffsetDateTime) -> Option<Duration> {
        let expires_at = self.product.as_ref()?.expires_at?;
        if expires_at <= now {
            Some(now - expires_at)
        } else {
            None
        }
    }
}
