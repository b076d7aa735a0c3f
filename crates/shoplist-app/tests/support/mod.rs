#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};

use anyhow::anyhow;
use shoplist_app::directives::{Directive, PresentationError, PresentationHost};
use shoplist_app::sync::{InlineRegroupLoader, RegroupEvent, RegroupLoader};
use shoplist_app::{Collaborators, ListSource, ShoppingListEngine};
use shoplist_core::auto_delete::{AutoDeleteSetting, OnboardingState};
use shoplist_core::config::ShoplistConfig;
use shoplist_core::grouped::{MyListPlacement, group_rows};
use shoplist_core::item::{ItemId, ItemKey, Product, ShoppingItem, Store, StoreId};
use shoplist_core::row::Row;
use shoplist_core::settings::{Settings, SettingsStore};
use shoplist_core::storage::{Storage, StorageError};
use shoplist_core::time::Clock;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

pub const NOW: OffsetDateTime = datetime!(2026-04-10 9:00 UTC);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCall {
    Delete(ItemKey),
    Undo(ItemKey, u32),
    BulkDelete(Vec<ItemKey>),
    Checked(ItemKey, bool),
    Quantity(ItemKey, u32, String),
    Note(ItemKey, String),
    Move(ItemKey, StoreId, u32),
    Manual(ItemKey),
}

#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<Vec<ShoppingItem>>,
    calls: Mutex<Vec<StorageCall>>,
    fail_writes: Mutex<bool>,
}

impl MemoryStorage {
    pub fn new(items: Vec<ShoppingItem>) -> Self {
        Self {
            items: Mutex::new(items),
            calls: Mutex::new(Vec::new()),
            fail_writes: Mutex::new(false),
        }
    }

    pub fn calls(&self) -> Vec<StorageCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn items(&self) -> Vec<ShoppingItem> {
        self.items.lock().expect("items lock").clone()
    }

    /// Drops a record behind the engine's back.
    pub fn forget(&self, key: &ItemKey) {
        self.items
            .lock()
            .expect("items lock")
            .retain(|item| !item.matches_key(key));
    }

    pub fn fail_writes(&self) {
        *self.fail_writes.lock().expect("fail lock") = true;
    }

    fn record(&self, call: StorageCall) -> anyhow::Result<()> {
        self.calls.lock().expect("calls lock").push(call);
        if *self.fail_writes.lock().expect("fail lock") {
            return Err(anyhow!("disk full"));
        }
        Ok(())
    }

    fn with_item(
        &self,
        key: &ItemKey,
        apply: impl FnOnce(&mut ShoppingItem),
    ) -> anyhow::Result<()> {
        let mut items = self.items.lock().expect("items lock");
        let item = items
            .iter_mut()
            .find(|item| item.matches_key(key))
            .ok_or(StorageError::MissingItem { key: *key })?;
        apply(item);
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn query_active_items(&self) -> anyhow::Result<Vec<ShoppingItem>> {
        Ok(self.items())
    }

    fn persist_delete(&self, key: &ItemKey) -> anyhow::Result<()> {
        self.record(StorageCall::Delete(*key))?;
        let mut items = self.items.lock().expect("items lock");
        let index = items
            .iter()
            .position(|item| item.matches_key(key))
            .ok_or(StorageError::MissingItem { key: *key })?;
        items.remove(index);
        Ok(())
    }

    fn persist_undo(&self, item: &ShoppingItem, position: u32) -> anyhow::Result<()> {
        let key = item.key().expect("undo of keyed item");
        self.record(StorageCall::Undo(key, position))?;
        let mut items = self.items.lock().expect("items lock");
        let mut restored = item.clone();
        restored.position = position;
        match items.iter_mut().find(|stored| stored.same_entry(item)) {
            Some(stored) => *stored = restored,
            None => items.push(restored),
        }
        Ok(())
    }

    fn persist_bulk_delete(&self, keys: &[ItemKey]) -> anyhow::Result<usize> {
        self.record(StorageCall::BulkDelete(keys.to_vec()))?;
        let mut items = self.items.lock().expect("items lock");
        let before = items.len();
        items.retain(|item| !keys.iter().any(|key| item.matches_key(key)));
        Ok(before - items.len())
    }

    fn persist_checked_state(&self, key: &ItemKey, checked: bool) -> anyhow::Result<()> {
        self.record(StorageCall::Checked(*key, checked))?;
        self.with_item(key, |item| item.checked = checked)
    }

    fn persist_quantity(&self, key: &ItemKey, quantity: u32, unit: &str) -> anyhow::Result<()> {
        self.record(StorageCall::Quantity(*key, quantity, unit.to_string()))?;
        self.with_item(key, |item| {
            item.quantity = quantity;
            item.quantity_unit = unit.to_string();
        })
    }

    fn persist_note(&self, key: &ItemKey, note: &str) -> anyhow::Result<()> {
        self.record(StorageCall::Note(*key, note.to_string()))?;
        self.with_item(key, |item| item.note = note.to_string())
    }

    fn persist_move(&self, key: &ItemKey, store: &Store, position: u32) -> anyhow::Result<()> {
        self.record(StorageCall::Move(*key, store.id, position))?;
        self.with_item(key, |item| {
            item.store = store.clone();
            item.position = position;
        })
    }

    fn persist_manual_item(&self, item: &ShoppingItem) -> anyhow::Result<ItemId> {
        let key = item.key().expect("manual item key");
        self.record(StorageCall::Manual(key))?;
        let mut items = self.items.lock().expect("items lock");
        let id = ItemId(
            items
                .iter()
                .filter_map(|stored| stored.id)
                .map(|id| id.0 + 1)
                .max()
                .unwrap_or(1),
        );
        let mut stored = item.clone();
        stored.id = Some(id);
        items.push(stored);
        Ok(id)
    }
}

#[derive(Default)]
pub struct MemorySettings {
    settings: Mutex<Settings>,
}

impl MemorySettings {
    pub fn with(setting: AutoDeleteSetting, onboarding: OnboardingState, count: u64) -> Self {
        Self {
            settings: Mutex::new(Settings {
                auto_delete: setting,
                onboarding,
                auto_delete_count: count,
            }),
        }
    }

    pub fn snapshot(&self) -> Settings {
        *self.settings.lock().expect("settings lock")
    }
}

impl SettingsStore for MemorySettings {
    fn auto_delete_setting(&self) -> anyhow::Result<AutoDeleteSetting> {
        Ok(self.snapshot().auto_delete)
    }

    fn set_auto_delete_setting(&self, setting: AutoDeleteSetting) -> anyhow::Result<()> {
        self.settings.lock().expect("settings lock").auto_delete = setting;
        Ok(())
    }

    fn onboarding_state(&self) -> anyhow::Result<OnboardingState> {
        Ok(self.snapshot().onboarding)
    }

    fn set_onboarding_state(&self, state: OnboardingState) -> anyhow::Result<()> {
        self.settings.lock().expect("settings lock").onboarding = state;
        Ok(())
    }

    fn auto_delete_count(&self) -> anyhow::Result<u64> {
        Ok(self.snapshot().auto_delete_count)
    }

    fn increment_auto_delete_count(&self, by: u64) -> anyhow::Result<u64> {
        let mut settings = self.settings.lock().expect("settings lock");
        settings.auto_delete_count += by;
        Ok(settings.auto_delete_count)
    }

    fn reset_auto_delete_count(&self) -> anyhow::Result<u64> {
        let mut settings = self.settings.lock().expect("settings lock");
        Ok(std::mem::take(&mut settings.auto_delete_count))
    }
}

#[derive(Default)]
pub struct RecordingHost {
    directives: Mutex<Vec<Directive>>,
    unavailable: Mutex<bool>,
}

impl RecordingHost {
    pub fn take(&self) -> Vec<Directive> {
        std::mem::take(&mut *self.directives.lock().expect("directives lock"))
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().expect("unavailable lock") = unavailable;
    }
}

impl PresentationHost for RecordingHost {
    fn present(&self, directive: Directive) -> Result<(), PresentationError> {
        if *self.unavailable.lock().expect("unavailable lock") {
            return Err(PresentationError::Unavailable {
                reason: "screen torn down".to_string(),
            });
        }
        self.directives.lock().expect("directives lock").push(directive);
        Ok(())
    }
}

pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn at(now: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().expect("clock lock") += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().expect("clock lock")
    }
}

/// Holds regroup results until the test releases them, in any order.
#[derive(Default)]
pub struct HeldLoader {
    held: Mutex<Vec<(u64, Vec<ShoppingItem>, MyListPlacement, Sender<RegroupEvent>)>>,
}

impl HeldLoader {
    pub fn tokens(&self) -> Vec<u64> {
        self.held
            .lock()
            .expect("held lock")
            .iter()
            .map(|(token, ..)| *token)
            .collect()
    }

    pub fn release(&self, token: u64) {
        let mut held = self.held.lock().expect("held lock");
        let index = held
            .iter()
            .position(|(held_token, ..)| *held_token == token)
            .expect("held token");
        let (token, items, placement, sender) = held.remove(index);
        let rows = group_rows(items.clone(), placement);
        let _ = sender.send(RegroupEvent::Done {
            token,
            items,
            rows,
        });
    }
}

impl RegroupLoader for HeldLoader {
    fn spawn_regroup(
        &self,
        items: Vec<ShoppingItem>,
        placement: MyListPlacement,
        token: u64,
    ) -> Receiver<RegroupEvent> {
        let (sender, receiver) = mpsc::channel();
        self.held
            .lock()
            .expect("held lock")
            .push((token, items, placement, sender));
        receiver
    }
}

pub struct Fixture {
    pub storage: MemoryStorage,
    pub settings: MemorySettings,
    pub host: RecordingHost,
    pub clock: ManualClock,
    pub loader: InlineRegroupLoader,
    pub config: ShoplistConfig,
}

impl Fixture {
    pub fn new(items: Vec<ShoppingItem>) -> Self {
        Self {
            storage: MemoryStorage::new(items),
            settings: MemorySettings::default(),
            host: RecordingHost::default(),
            clock: ManualClock::at(NOW),
            loader: InlineRegroupLoader,
            config: ShoplistConfig::default(),
        }
    }

    pub fn with_settings(mut self, settings: MemorySettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            storage: &self.storage,
            settings: &self.settings,
            host: &self.host,
            clock: &self.clock,
            loader: &self.loader,
        }
    }

    pub fn engine(&self, source: ListSource) -> ShoppingListEngine<'_> {
        ShoppingListEngine::new(self.collaborators(), self.config.clone(), source)
    }

    /// Main-list engine with the stored items on screen and the host log cleared.
    pub fn loaded(&self) -> ShoppingListEngine<'_> {
        let mut engine = self.engine(ListSource::Main);
        engine.refresh_from_storage().expect("initial load");
        self.host.take();
        engine
    }
}

pub fn store(id: u64, name: &str) -> Store {
    Store::new(id, name)
}

pub fn catalog(id: u64, store: Store, title: &str) -> ShoppingItem {
    ShoppingItem::catalog(id, store, title, Product::new(id))
}

pub fn expired(id: u64, store: Store, title: &str) -> ShoppingItem {
    ShoppingItem::catalog(
        id,
        store,
        title,
        Product::new(id).expiring_at(NOW - Duration::days(10)),
    )
}

pub fn manual(store: Store, title: &str) -> ShoppingItem {
    ShoppingItem::manual(store, title)
}

pub fn key(id: u64) -> ItemKey {
    ItemKey::Durable(ItemId(id))
}

/// `H<store>`, `#<id>`, `~<title>` and `F` per row.
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
