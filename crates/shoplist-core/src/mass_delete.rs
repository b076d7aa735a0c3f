use std::fmt;
use std::str::FromStr;

use time::OffsetDateTime;

use crate::item::{ItemKey, ShoppingItem};
use crate::row::Row;

/// A list needs at least a header, one entry and the footer to be cleared.
pub const MIN_ROWS_FOR_MASS_DELETE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteType {
    All,
    Checked,
    Expired,
    CheckedAndExpired,
}

impl DeleteType {
    /// Clearing everything asks first; the narrower criteria run immediately.
    pub fn requires_confirmation(self) -> bool {
        self == Self::All
    }

    pub fn selects(self, item: &ShoppingItem, now: OffsetDateTime) -> bool {
        match self {
            Self::All => true,
            Self::Checked => item.checked,
            Self::Expired => item.is_expired(now),
            Self::CheckedAndExpired => item.checked || item.is_expired(now),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Checked => "checked",
            Self::Expired => "expired",
            Self::CheckedAndExpired => "checked-and-expired",
        }
    }
}

impl fmt::Display for DeleteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeleteType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "checked" => Ok(Self::Checked),
            "expired" => Ok(Self::Expired),
            "checked-and-expired" => Ok(Self::CheckedAndExpired),
            other => Err(format!(
                "unknown delete type '{other}' (expected all, checked, expired or checked-and-expired)"
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    pub indices: Vec<usize>,
    pub keys: Vec<ItemKey>,
    /// Whether any selected entry was expired when classified.
    pub contains_expired: bool,
}

impl RowSet {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }
}

pub fn classify(delete_type: DeleteType, rows: &[Row], now: OffsetDateTime) -> RowSet {
    let mut selection = RowSet::default();
    if rows.len() < MIN_ROWS_FOR_MASS_DELETE {
        return selection;
    }

    for (index, row) in rows.iter().enumerate() {
        let Some(item) = row.shopping_item() else {
            continue;
        };
        if !delete_type.selects(item, now) {
            continue;
        }
        let Some(key) = item.key() else {
            continue;
        };

        selection.indices.push(index);
        selection.keys.push(key);
        selection.contains_expired |= item.is_expired(now);
    }

    selection
}
