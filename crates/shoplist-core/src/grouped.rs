//! Grouped row sequence: one header per store, its entries, one trailing footer.
//!
//! The sequence always reads `Header Row+ (Header Row+)* Footer`, or just
//! `Footer` when there is nothing to show. The primitive `insert_row` and
//! `remove_row` edits do not enforce that; the composite operations
//! (`remove_with_collapse`, `restore`, `relocate`, `insert_item`,
//! `reinsert_item`, `rebuild`) do.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::item::{ItemId, ItemKey, ShoppingItem, Store, StoreId};
use crate::row::{Row, RowKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MyListPlacement {
    #[default]
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListError {
    #[error("row index {index} is out of range for a list of {len} rows")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("row {index} is a {kind} and cannot be removed")]
    NotRemovable { index: usize, kind: RowKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffMode {
    /// Any change is reported as a full reload.
    Coalesce,
    /// Changes are reported row by row; used while animations are pending.
    Granular,
}

/// One step of an edit script. Steps apply in order, each against the
/// sequence produced by the steps before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowChange {
    Inserted { index: usize },
    Removed { index: usize },
    Updated { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListDiff {
    Unchanged,
    Reload { len: usize },
    Changes(Vec<RowChange>),
}

/// Everything needed to put a swiped row back where it was.
#[derive(Debug, Clone)]
pub struct RemovedRow {
    pub row: Row,
    pub header: Option<Row>,
    pub item_index: usize,
    pub header_index: usize,
}

impl RemovedRow {
    pub fn header_removed(&self) -> bool {
        self.header.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    /// Final index of the moved row after header cleanup.
    pub index: usize,
    pub removed_header: Option<usize>,
    /// Zero-based position of the moved row inside its group.
    pub position: u32,
}

#[derive(Debug, Clone)]
pub struct GroupedList {
    rows: Vec<Row>,
    generation: u64,
}

impl Default for GroupedList {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupedList {
    pub fn new() -> Self {
        Self {
            rows: vec![Row::Footer],
            generation: 0,
        }
    }

    pub fn from_items(items: Vec<ShoppingItem>, placement: MyListPlacement) -> Self {
        Self {
            rows: group_rows(items, placement),
            generation: 0,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no removable row is left (only the footer remains).
    pub fn is_empty(&self) -> bool {
        !self.rows.iter().any(Row::is_removable)
    }

    pub fn item_count(&self) -> usize {
        self.rows.iter().filter(|row| row.is_removable()).count()
    }

    /// Bumped on every structural edit and every rebuild; indices captured
    /// under an older generation no longer line up with the sequence.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn row_at(&self, index: usize) -> Result<&Row, ListError> {
        self.rows.get(index).ok_or(ListError::IndexOutOfRange {
            index,
            len: self.rows.len(),
        })
    }

    pub fn kind_at(&self, index: usize) -> Result<RowKind, ListError> {
        self.row_at(index).map(Row::kind)
    }

    pub fn insert_row(&mut self, index: usize, row: Row) -> Result<(), ListError> {
        if index > self.rows.len() {
            return Err(ListError::IndexOutOfRange {
                index,
                len: self.rows.len(),
            });
        }
        self.rows.insert(index, row);
        self.generation += 1;
        Ok(())
    }

    pub fn remove_row(&mut self, index: usize) -> Result<Row, ListError> {
        self.row_at(index)?;
        self.generation += 1;
        Ok(self.rows.remove(index))
    }

    pub fn position_of(&self, key: &ItemKey) -> Option<usize> {
        self.rows.iter().position(|row| {
            row.shopping_item()
                .is_some_and(|item| item.matches_key(key))
        })
    }

    pub fn position_of_entry(&self, entry: &ShoppingItem) -> Option<usize> {
        self.rows.iter().position(|row| {
            row.shopping_item()
                .is_some_and(|item| item.same_entry(entry))
        })
    }

    pub fn header_index_of(&self, store: StoreId) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.header_store().is_some_and(|header| header.id == store))
    }

    pub fn owning_header_index(&self, index: usize) -> Option<usize> {
        self.rows
            .get(..=index)?
            .iter()
            .rposition(Row::is_header)
    }

    pub fn rebuild(
        &mut self,
        items: Vec<ShoppingItem>,
        placement: MyListPlacement,
        mode: DiffMode,
    ) -> ListDiff {
        self.replace_rows(group_rows(items, placement), mode)
    }

    /// Swaps in a sequence produced by [`group_rows`], possibly on another thread.
    pub fn replace_rows(&mut self, rows: Vec<Row>, mode: DiffMode) -> ListDiff {
        let diff = match mode {
            DiffMode::Coalesce if same_rows(&self.rows, &rows) => ListDiff::Unchanged,
            DiffMode::Coalesce => ListDiff::Reload { len: rows.len() },
            DiffMode::Granular => {
                let changes = diff_rows(&self.rows, &rows);
                if changes.is_empty() {
                    ListDiff::Unchanged
                } else {
                    ListDiff::Changes(changes)
                }
            }
        };
        self.rows = rows;
        self.generation += 1;
        diff
    }

    /// Whether removing the row at `index` empties its group.
    ///
    /// Evaluated on the sequence before removal: the row above must be a
    /// header, and the row is either second-to-last or followed by a header
    /// or the footer.
    pub fn collapses_header(&self, index: usize) -> bool {
        if index == 0 || index >= self.rows.len() {
            return false;
        }
        if !self.rows[index - 1].is_header() {
            return false;
        }
        index + 2 == self.rows.len()
            || self
                .rows
                .get(index + 1)
                .is_some_and(Row::is_group_boundary)
    }

    pub fn remove_with_collapse(&mut self, index: usize) -> Result<RemovedRow, ListError> {
        let kind = self.kind_at(index)?;
        if !self.rows[index].is_removable() {
            return Err(ListError::NotRemovable { index, kind });
        }

        let collapse = self.collapses_header(index);
        self.generation += 1;
        let row = self.rows.remove(index);
        let header = if collapse {
            Some(self.rows.remove(index - 1))
        } else {
            None
        };

        debug!(index, header_removed = collapse, "removed row");

        Ok(RemovedRow {
            row,
            header,
            item_index: index,
            header_index: index.saturating_sub(1),
        })
    }

    /// Reverses [`GroupedList::remove_with_collapse`]; returns the row's index.
    pub fn restore(&mut self, removed: &RemovedRow) -> Result<usize, ListError> {
        let header_rows = usize::from(removed.header_removed());
        let len = self.rows.len();
        if removed.item_index >= len + header_rows || removed.header_index > len {
            return Err(ListError::IndexOutOfRange {
                index: removed.item_index,
                len,
            });
        }

        if let Some(header) = &removed.header {
            self.rows.insert(removed.header_index, header.clone());
        }
        self.rows.insert(removed.item_index, removed.row.clone());
        self.generation += 1;
        Ok(removed.item_index)
    }

    /// Moves a removable row, keeping it between the first header and the footer.
    pub fn move_row(&mut self, from: usize, to: usize) -> Result<usize, ListError> {
        let kind = self.kind_at(from)?;
        if !self.rows[from].is_removable() {
            return Err(ListError::NotRemovable { index: from, kind });
        }

        let to = to.clamp(1, self.rows.len() - 2);
        let row = self.rows.remove(from);
        self.rows.insert(to, row);
        self.generation += 1;
        Ok(to)
    }

    /// Drops the header left dangling at `original` after a drag.
    ///
    /// Only the moved-from neighbourhood is inspected. If the row now at
    /// `original` is a header and the row above it is a header too, the upper
    /// one lost its last entry; otherwise, if the row below is a header or the
    /// footer, the header at `original` is the empty one.
    pub fn cleanup_after_move(&mut self, original: usize) -> Option<usize> {
        if !self.rows.get(original)?.is_header() {
            return None;
        }

        if original > 0 && self.rows[original - 1].is_header() {
            self.rows.remove(original - 1);
            self.generation += 1;
            return Some(original - 1);
        }

        if self
            .rows
            .get(original + 1)
            .is_some_and(Row::is_group_boundary)
        {
            self.rows.remove(original);
            self.generation += 1;
            return Some(original);
        }

        None
    }

    /// Completes a drag from `original` to `to`: moves the row, removes any
    /// emptied header, and re-homes the entry under its new group's store.
    pub fn relocate(&mut self, original: usize, to: usize) -> Result<Relocation, ListError> {
        let landed = self.move_row(original, to)?;
        Ok(self.settle_move(original, landed))
    }

    /// Second half of a drag whose row already sits at `landed`.
    pub fn settle_move(&mut self, original: usize, landed: usize) -> Relocation {
        let removed_header = self.cleanup_after_move(original);
        let index = match removed_header {
            Some(removed) if removed < landed => landed - 1,
            _ => landed,
        };
        self.rehome(index);

        Relocation {
            index,
            removed_header,
            position: self.position_in_group(index),
        }
    }

    /// Assigns the row at `index` to the store of the group it now sits in.
    pub fn rehome(&mut self, index: usize) -> Option<Store> {
        let header_index = self.owning_header_index(index)?;
        let store = self.rows[header_index].header_store()?.clone();
        let item = self.rows.get_mut(index)?.shopping_item_mut()?;
        if item.store.id != store.id {
            self.generation += 1;
        }
        item.store = store.clone();
        Some(store)
    }

    pub fn position_in_group(&self, index: usize) -> u32 {
        let Some(header_index) = self.owning_header_index(index) else {
            return 0;
        };
        let offset = index.saturating_sub(header_index + 1);
        u32::try_from(offset).unwrap_or(u32::MAX)
    }

    /// Appends an entry to its store's group, opening the group if needed.
    /// Returns the entry's index and whether a header was inserted.
    pub fn insert_item(
        &mut self,
        mut item: ShoppingItem,
        placement: MyListPlacement,
    ) -> (usize, bool) {
        if let Some(header_index) = self.header_index_of(item.store.id) {
            let end = self.group_end(header_index);
            item.position = self.rows[header_index + 1..end]
                .iter()
                .filter_map(Row::shopping_item)
                .map(|existing| existing.position + 1)
                .max()
                .unwrap_or(0);
            self.rows.insert(end, Row::for_item(item));
            self.generation += 1;
            return (end, false);
        }

        item.position = 0;
        let header_index = self.open_group(&item.store, placement);
        self.rows.insert(header_index + 1, Row::for_item(item));
        (header_index + 1, true)
    }

    /// Puts an entry back into its store's group ahead of the first entry
    /// that sorts after it, opening the group if it is gone. Unlike
    /// [`GroupedList::restore`] this trusts no saved index.
    pub fn reinsert_item(
        &mut self,
        item: ShoppingItem,
        placement: MyListPlacement,
    ) -> (usize, bool) {
        if let Some(header_index) = self.header_index_of(item.store.id) {
            let end = self.group_end(header_index);
            let at = self.rows[header_index + 1..end]
                .iter()
                .position(|row| {
                    row.shopping_item()
                        .is_some_and(|existing| group_order(existing) > group_order(&item))
                })
                .map_or(end, |offset| header_index + 1 + offset);
            self.rows.insert(at, Row::for_item(item));
            self.generation += 1;
            return (at, false);
        }

        let header_index = self.open_group(&item.store, placement);
        self.rows.insert(header_index + 1, Row::for_item(item));
        (header_index + 1, true)
    }

    /// Replaces the stored fields of an entry already in the list.
    pub fn update_item(&mut self, item: ShoppingItem) -> Option<usize> {
        let index = self.position_of_entry(&item)?;
        if let Some(existing) = self.rows[index].shopping_item_mut() {
            if existing.store.id != item.store.id {
                self.generation += 1;
            }
            *existing = item;
        }
        Some(index)
    }

    /// Inserts a header for `store` where store order puts it; returns its index.
    fn open_group(&mut self, store: &Store, placement: MyListPlacement) -> usize {
        let footer_index = self.rows.len() - 1;
        let at = self
            .rows
            .iter()
            .position(|row| match row {
                Row::Header { store: existing } => {
                    compare_stores(store, existing, placement) == Ordering::Less
                }
                Row::Footer => true,
                Row::Item { .. } | Row::ManualItem { .. } => false,
            })
            .unwrap_or(footer_index);

        self.rows.insert(at, Row::header(store.clone()));
        self.generation += 1;
        at
    }

    fn group_end(&self, header_index: usize) -> usize {
        self.rows[header_index + 1..]
            .iter()
            .position(Row::is_group_boundary)
            .map(|offset| header_index + 1 + offset)
            .unwrap_or(self.rows.len())
    }
}

/// Partitions entries by store and lays out the full row sequence.
///
/// Pure; safe to run away from the thread that owns the live list.
pub fn group_rows(items: Vec<ShoppingItem>, placement: MyListPlacement) -> Vec<Row> {
    let mut by_store: BTreeMap<StoreId, (Store, Vec<ShoppingItem>)> = BTreeMap::new();
    for item in items {
        by_store
            .entry(item.store.id)
            .or_insert_with(|| (item.store.clone(), Vec::new()))
            .1
            .push(item);
    }

    let mut groups: Vec<(Store, Vec<ShoppingItem>)> = by_store.into_values().collect();
    groups.sort_by(|(left, _), (right, _)| compare_stores(left, right, placement));

    let mut rows = Vec::with_capacity(groups.iter().map(|(_, items)| items.len() + 1).sum::<usize>() + 1);
    for (store, mut items) in groups {
        items.sort_by_key(group_order);
        rows.push(Row::header(store));
        rows.extend(items.into_iter().map(Row::for_item));
    }
    rows.push(Row::Footer);
    rows
}

fn group_order(item: &ShoppingItem) -> (u32, bool, Option<ItemId>) {
    (item.position, item.id.is_none(), item.id)
}

pub fn compare_stores(left: &Store, right: &Store, placement: MyListPlacement) -> Ordering {
    let pinned = match placement {
        MyListPlacement::First => Ordering::Less,
        MyListPlacement::Last => Ordering::Greater,
    };

    match (left.id.is_my_list(), right.id.is_my_list()) {
        (true, true) => Ordering::Equal,
        (true, false) => pinned,
        (false, true) => pinned.reverse(),
        (false, false) => left
            .name
            .to_lowercase()
            .cmp(&right.name.to_lowercase())
            .then(left.id.cmp(&right.id)),
    }
}

fn same_row(left: &Row, right: &Row) -> bool {
    left == right && left.content_eq(right)
}

fn same_rows(old: &[Row], new: &[Row]) -> bool {
    old.len() == new.len() && old.iter().zip(new).all(|(l, r)| same_row(l, r))
}

/// Edit script turning `old` into `new`, matching rows by identity.
///
/// The unchanged prefix and suffix are skipped; only the rows between them
/// go through the LCS table.
pub fn diff_rows(old: &[Row], new: &[Row]) -> Vec<RowChange> {
    let prefix = old
        .iter()
        .zip(new)
        .take_while(|(l, r)| same_row(l, r))
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(l, r)| same_row(l, r))
        .count();

    let old = &old[prefix..old.len() - suffix];
    let new = &new[prefix..new.len() - suffix];
    let (n, m) = (old.len(), new.len());
    let mut common = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            common[i][j] = if old[i] == new[j] {
                common[i + 1][j + 1] + 1
            } else {
                common[i + 1][j].max(common[i][j + 1])
            };
        }
    }

    let mut changes = Vec::new();
    let (mut i, mut j, mut index) = (0, 0, prefix);
    while i < n || j < m {
        if i < n && j < m && old[i] == new[j] {
            if !old[i].content_eq(&new[j]) {
                changes.push(RowChange::Updated { index });
            }
            i += 1;
            j += 1;
            index += 1;
        } else if j < m && (i == n || common[i][j + 1] >= common[i + 1][j]) {
            changes.push(RowChange::Inserted { index });
            j += 1;
            index += 1;
        } else {
            changes.push(RowChange::Removed { index });
            i += 1;
        }
    }
    changes
}

pub fn is_well_formed(rows: &[Row]) -> bool {
    let Some((last, body)) = rows.split_last() else {
        return false;
    };
    if !last.is_footer() {
        return false;
    }

    let mut seen_header = false;
    let mut header_open = false;
    for row in body {
        match row.kind() {
            RowKind::Footer => return false,
            RowKind::Header => {
                if header_open {
                    return false;
                }
                seen_header = true;
                header_open = true;
            }
            RowKind::Item | RowKind::ManualItem => {
                if !seen_header {
                    return false;
                }
                header_open = false;
            }
        }
    }
    !header_open
}
