use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::item::{ItemId, ItemKey, ShoppingItem, Store};

const LIST_VERSION: i64 = 1;

/// Durable home of the shopping entries. Every call is a complete unit of work.
pub trait Storage {
    fn query_active_items(&self) -> anyhow::Result<Vec<ShoppingItem>>;

    fn persist_delete(&self, key: &ItemKey) -> anyhow::Result<()>;

    /// Upserts `item` at `position` within its store; repeating it is harmless.
    fn persist_undo(&self, item: &ShoppingItem, position: u32) -> anyhow::Result<()>;

    fn persist_bulk_delete(&self, keys: &[ItemKey]) -> anyhow::Result<usize>;

    fn persist_checked_state(&self, key: &ItemKey, checked: bool) -> anyhow::Result<()>;

    fn persist_quantity(&self, key: &ItemKey, quantity: u32, unit: &str) -> anyhow::Result<()>;

    fn persist_note(&self, key: &ItemKey, note: &str) -> anyhow::Result<()>;

    fn persist_move(&self, key: &ItemKey, store: &Store, position: u32) -> anyhow::Result<()>;

    fn persist_manual_item(&self, item: &ShoppingItem) -> anyhow::Result<ItemId>;
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read list at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse list at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to write list at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize list: {0}")]
    Serialize(toml::ser::Error),
    #[error("{message}")]
    InvalidSchema { message: String },
    #[error("no stored item matches {key}")]
    MissingItem { key: ItemKey },
    #[error("manual item '{title}' has no correlation id")]
    MissingCorrelation { title: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ListFile {
    version: i64,
    #[serde(default = "first_id")]
    next_id: u64,
    #[serde(rename = "item", default)]
    items: Vec<ShoppingItem>,
}

fn first_id() -> u64 {
    1
}

impl Default for ListFile {
    fn default() -> Self {
        Self {
            version: LIST_VERSION,
            next_id: first_id(),
            items: Vec::new(),
        }
    }
}

impl ListFile {
    fn find_mut(&mut self, key: &ItemKey) -> Result<&mut ShoppingItem, StorageError> {
        self.items
            .iter_mut()
            .find(|item| item.matches_key(key))
            .ok_or(StorageError::MissingItem { key: *key })
    }

    fn allocate_id(&mut self) -> ItemId {
        let in_use = self
            .items
            .iter()
            .filter_map(|item| item.id)
            .map(|id| id.0 + 1)
            .max()
            .unwrap_or(1);
        let id = self.next_id.max(in_use);
        self.next_id = id + 1;
        ItemId(id)
    }

    /// Opens a slot at `position` in `store`, pushing later entries down.
    fn make_room(&mut self, store: &Store, position: u32, moving: &ItemKey) {
        for item in &mut self.items {
            if item.store.id == store.id && item.position >= position && !item.matches_key(moving)
            {
                item.position += 1;
            }
        }
    }
}

/// `list.toml` backed storage.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(list_path(dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the stored entries wholesale, keeping ids as given.
    pub fn seed(&self, items: Vec<ShoppingItem>) -> Result<(), StorageError> {
        let mut file = ListFile {
            items,
            ..ListFile::default()
        };
        let next = file.allocate_id();
        file.next_id = next.0;
        write_list_file(&self.path, &file)
    }

    fn update<T>(
        &self,
        apply: impl FnOnce(&mut ListFile) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut file = load_list_file(&self.path)?;
        let value = apply(&mut file)?;
        write_list_file(&self.path, &file)?;
        Ok(value)
    }
}

impl Storage for FileStorage {
    fn query_active_items(&self) -> anyhow::Result<Vec<ShoppingItem>> {
        Ok(load_list_file(&self.path)?.items)
    }

    fn persist_delete(&self, key: &ItemKey) -> anyhow::Result<()> {
        self.update(|file| {
            let index = file
                .items
                .iter()
                .position(|item| item.matches_key(key))
                .ok_or(StorageError::MissingItem { key: *key })?;
            file.items.remove(index);
            Ok(())
        })?;
        debug!(%key, "deleted stored item");
        Ok(())
    }

    fn persist_undo(&self, item: &ShoppingItem, position: u32) -> anyhow::Result<()> {
        self.update(|file| {
            let mut restored = item.clone();
            restored.position = position;
            match file.items.iter_mut().find(|stored| stored.same_entry(item)) {
                Some(stored) => *stored = restored,
                None => file.items.push(restored),
            }
            Ok(())
        })?;
        Ok(())
    }

    fn persist_bulk_delete(&self, keys: &[ItemKey]) -> anyhow::Result<usize> {
        let removed = self.update(|file| {
            let before = file.items.len();
            file.items
                .retain(|item| !keys.iter().any(|key| item.matches_key(key)));
            Ok(before - file.items.len())
        })?;
        if removed < keys.len() {
            debug!(
                requested = keys.len(),
                removed, "bulk delete skipped items that were already gone"
            );
        }
        Ok(removed)
    }

    fn persist_checked_state(&self, key: &ItemKey, checked: bool) -> anyhow::Result<()> {
        self.update(|file| {
            file.find_mut(key)?.checked = checked;
            Ok(())
        })?;
        Ok(())
    }

    fn persist_quantity(&self, key: &ItemKey, quantity: u32, unit: &str) -> anyhow::Result<()> {
        self.update(|file| {
            let item = file.find_mut(key)?;
            item.quantity = quantity;
            item.quantity_unit = unit.to_string();
            Ok(())
        })?;
        Ok(())
    }

    fn persist_note(&self, key: &ItemKey, note: &str) -> anyhow::Result<()> {
        self.update(|file| {
            file.find_mut(key)?.note = note.to_string();
            Ok(())
        })?;
        Ok(())
    }

    fn persist_move(&self, key: &ItemKey, store: &Store, position: u32) -> anyhow::Result<()> {
        self.update(|file| {
            file.find_mut(key)?;
            file.make_room(store, position, key);
            let item = file.find_mut(key)?;
            item.store = store.clone();
            item.position = position;
            Ok(())
        })?;
        Ok(())
    }

    fn persist_manual_item(&self, item: &ShoppingItem) -> anyhow::Result<ItemId> {
        let Some(uuid) = item.manual_uuid else {
            return Err(StorageError::MissingCorrelation {
                title: item.title.clone(),
            }
            .into());
        };

        let id = self.update(|file| {
            if let Some(existing) = file
                .items
                .iter()
                .find(|stored| stored.manual_uuid == Some(uuid))
                .and_then(|stored| stored.id)
            {
                return Ok(existing);
            }

            let id = item.id.unwrap_or_else(|| file.allocate_id());
            let mut stored = item.clone();
            stored.id = Some(id);
            file.items.push(stored);
            Ok(id)
        })?;
        debug!(%id, %uuid, "stored manual item");
        Ok(id)
    }
}

pub fn list_path(dir: &Path) -> PathBuf {
    dir.join("list.toml")
}

fn load_list_file(path: &Path) -> Result<ListFile, StorageError> {
    if !path.exists() {
        return Ok(ListFile::default());
    }

    let raw = fs::read_to_string(path).map_err(|source| StorageError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let parsed_value: toml::Value = toml::from_str(&raw).map_err(|source| StorageError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_list_schema(&parsed_value)?;

    parsed_value
        .try_into()
        .map_err(|source| StorageError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

fn validate_list_schema(value: &toml::Value) -> Result<(), StorageError> {
    let Some(version) = value.as_table().and_then(|root| root.get("version")) else {
        return Err(schema_error(
            "invalid list schema: missing required top-level field 'version'".to_string(),
        ));
    };

    match version.as_integer() {
        Some(current) if current == LIST_VERSION => Ok(()),
        Some(current) => Err(schema_error(format!(
            "invalid list schema: unsupported version (expected {LIST_VERSION}, found {current})"
        ))),
        None => Err(schema_error(
            "invalid list schema: unsupported version (expected integer)".to_string(),
        )),
    }
}

fn write_list_file(path: &Path, file: &ListFile) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let serialized = toml::to_string(file).map_err(StorageError::Serialize)?;
    let temp_path = path.with_extension("toml.tmp");

    fs::write(&temp_path, serialized).map_err(|source| StorageError::Write {
        path: temp_path.clone(),
        source,
    })?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(())
}

fn schema_error(message: String) -> StorageError {
    StorageError::InvalidSchema { message }
}
