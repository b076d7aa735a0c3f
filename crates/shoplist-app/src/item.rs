use anyhow::{Context, Result};
use shoplist_core::auto_delete::Trigger;
use shoplist_core::item::{ItemKey, ItemStatus, ShoppingItem};
use tracing::{debug, info, warn};

use crate::directives::Directive;
use crate::{EngineError, ListChange, QueuedMutation, ShoppingListEngine};

impl<'a> ShoppingListEngine<'a> {
    pub fn on_item_opened(&mut self, key: &ItemKey) -> Result<ListChange> {
        let index = self.index_of(key)?;
        let status = self
            .list
            .row_at(index)?
            .shopping_item()
            .map(|item| item.status(self.clock.now()))
            .unwrap_or(ItemStatus::Available);

        debug!(%key, status = status.label(), "item opened");
        match status {
            ItemStatus::Available => self.emit(Directive::OpenItem(*key)),
            ItemStatus::Expired => {
                self.evaluate_auto_delete(Trigger::UserOpenedExpiredItem)
                    .context("failed to evaluate auto-delete for an expired item")?;
            }
            ItemStatus::Disabled | ItemStatus::OutOfRegion => {
                self.emit(Directive::ShowStatusNotice(status));
            }
        }
        Ok(ListChange::None)
    }

    pub fn on_item_checked(&mut self, key: &ItemKey, checked: bool) -> Result<ListChange> {
        let index = self.index_of(key)?;
        let Some(mut item) = self.list.row_at(index)?.shopping_item().cloned() else {
            return Ok(ListChange::None);
        };
        if item.checked == checked {
            return Ok(ListChange::None);
        }

        if let Err(error) = self.storage.persist_checked_state(key, checked) {
            return self.recover_storage_failure(key, error);
        }

        item.checked = checked;
        self.refresh_entry(item)
    }

    /// Quantity typed by the user. Empty input clears the quantity; numbers
    /// are clamped to the configured bounds.
    pub fn on_quantity_edited(
        &mut self,
        key: &ItemKey,
        input: &str,
        unit: Option<&str>,
    ) -> Result<ListChange> {
        let index = self.index_of(key)?;
        let Some(mut item) = self.list.row_at(index)?.shopping_item().cloned() else {
            return Ok(ListChange::None);
        };

        let quantity = self.parse_quantity(input)?;
        let unit = unit.unwrap_or(&item.quantity_unit).to_string();
        if quantity == item.quantity && unit == item.quantity_unit {
            return Ok(ListChange::None);
        }

        if let Err(error) = self.storage.persist_quantity(key, quantity, &unit) {
            return self.recover_storage_failure(key, error);
        }

        item.quantity = quantity;
        item.quantity_unit = unit;
        self.refresh_entry(item)
    }

    pub fn on_note_edited(&mut self, key: &ItemKey, note: &str) -> Result<ListChange> {
        let index = self.index_of(key)?;
        let Some(mut item) = self.list.row_at(index)?.shopping_item().cloned() else {
            return Ok(ListChange::None);
        };
        if item.note == note {
            return Ok(ListChange::None);
        }

        if let Err(error) = self.storage.persist_note(key, note) {
            return self.recover_storage_failure(key, error);
        }

        item.note = note.to_string();
        self.refresh_entry(item)
    }

    /// Adds a free-text entry to its store's group and focuses it.
    pub fn on_manual_item_added(&mut self, item: ShoppingItem) -> Result<ListChange> {
        let Some(uuid) = item.manual_uuid.filter(|_| item.is_manual()) else {
            return Err(EngineError::NotManual { title: item.title }.into());
        };
        if self.session.modify_disabled {
            return Ok(self.queue_mutation(QueuedMutation::AddManual(item)));
        }

        let (index, header_inserted) = self
            .list
            .insert_item(item, self.config.list.my_list_placement);
        let key = ItemKey::Pending(uuid);
        if header_inserted {
            self.emit(Directive::RowInserted(index - 1));
        }
        self.emit(Directive::RowInserted(index));
        self.session.animating.insert(key);

        let Some(stored) = self.list.row_at(index)?.shopping_item().cloned() else {
            return Ok(ListChange::None);
        };
        match self.storage.persist_manual_item(&stored) {
            Ok(id) => {
                let mut stored = stored;
                stored.id = Some(id);
                self.list.update_item(stored);
                info!(%id, %uuid, "manual item added");
            }
            Err(error) => {
                warn!(%uuid, error = %format!("{error:#}"), "failed to store manual item");
                self.emit(Directive::ShowErrorNotice);
            }
        }

        self.emit(Directive::FocusRow(index));
        Ok(ListChange::Inserted {
            index,
            header: header_inserted.then_some(index - 1),
        })
    }

    fn parse_quantity(&self, input: &str) -> Result<u32> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(0);
        }
        let value: i64 = trimmed.parse().map_err(|_| EngineError::InvalidQuantity {
            input: input.to_string(),
        })?;
        Ok(self.config.quantity.clamp(value))
    }

    fn refresh_entry(&mut self, item: ShoppingItem) -> Result<ListChange> {
        match self.list.update_item(item) {
            Some(index) => {
                self.emit(Directive::RefreshRow(index));
                Ok(ListChange::Updated { index })
            }
            None => Ok(ListChange::None),
        }
    }
}
