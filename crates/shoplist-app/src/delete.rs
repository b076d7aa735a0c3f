use anyhow::{Context, Result};
use shoplist_core::auto_delete::Trigger;
use shoplist_core::grouped::{ListError, RemovedRow};
use shoplist_core::item::{ItemKey, ShoppingItem};
use shoplist_core::storage::StorageError;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::directives::Directive;
use crate::{ListChange, QueuedMutation, ShoppingListEngine};

/// A swiped row that can still be put back.
#[derive(Debug, Clone)]
pub struct PendingUndo {
    pub removed: RemovedRow,
    pub key: ItemKey,
    pub item: ShoppingItem,
    /// List generation right after the delete; any structural edit since then
    /// invalidates the saved indices.
    pub generation: u64,
    pub expires_at: OffsetDateTime,
    pub was_expired: bool,
}

impl<'a> ShoppingListEngine<'a> {
    /// Removes the row at `index` and opens the undo window for it.
    ///
    /// Mid-drag the request is queued against the row's key and replayed
    /// when the drag ends.
    pub fn on_swipe_delete(&mut self, index: usize) -> Result<ListChange> {
        let row = self.list.row_at(index)?;
        let (kind, removable, row_key) = (row.kind(), row.is_removable(), row.item_key());
        if removable && row_key.is_none() {
            warn!(index, "row has neither an id nor a correlation uuid, leaving it in place");
            return Ok(ListChange::None);
        }

        if self.session.modify_disabled {
            let Some(key) = row_key else {
                return Err(ListError::NotRemovable { index, kind }.into());
            };
            return Ok(self.queue_mutation(QueuedMutation::Swipe(key)));
        }

        self.confirm_pending_undo()?;

        let removed = self.list.remove_with_collapse(index)?;
        let Some(item) = removed.row.shopping_item().cloned() else {
            return Ok(ListChange::None);
        };
        let Some(key) = item.key() else {
            return Ok(ListChange::None);
        };

        let now = self.clock.now();
        let window = i64::try_from(self.config.undo.window_secs).unwrap_or(i64::MAX);
        let header = removed.header_removed().then_some(removed.header_index);

        self.emit(Directive::RowRemoved(index));
        if let Some(header_index) = header {
            self.emit(Directive::RowRemoved(header_index));
        }
        self.emit(Directive::ShowUndoAffordance {
            row: removed.row.clone(),
        });

        info!(%key, index, header_removed = header.is_some(), "row swiped away");
        self.session.animating.insert(key);
        self.session.pending_undo = Some(PendingUndo {
            was_expired: item.is_expired(now),
            removed,
            key,
            item,
            generation: self.list.generation(),
            expires_at: now.saturating_add(Duration::seconds(window)),
        });

        Ok(ListChange::Removed { index, header })
    }

    /// Puts the last swiped row back. Does nothing once the window has closed.
    pub fn on_undo_requested(&mut self) -> Result<ListChange> {
        if self.session.pending_undo.is_none() {
            debug!("undo requested with nothing to restore");
            return Ok(ListChange::None);
        }
        if self.session.modify_disabled {
            return Ok(self.queue_mutation(QueuedMutation::Undo));
        }
        let Some(pending) = self.session.pending_undo.take() else {
            return Ok(ListChange::None);
        };

        let (index, header) = self.put_back(&pending);
        if let Some(header_index) = header {
            self.emit(Directive::RowInserted(header_index));
        }
        self.emit(Directive::RowInserted(index));
        self.emit(Directive::FocusRow(index));

        let position = pending.item.position;
        if let Err(error) = self.storage.persist_undo(&pending.item, position) {
            warn!(key = %pending.key, error = %format!("{error:#}"), "failed to persist undo");
            self.emit(Directive::ShowErrorNotice);
        }

        self.emit(Directive::DismissUndoAffordance);
        info!(key = %pending.key, index, "row restored");
        self.after_undo_window(&pending)?;
        Ok(ListChange::Inserted { index, header })
    }

    /// Reinserts the swiped row: at its saved indices when nothing moved
    /// since the delete, otherwise by store and position.
    fn put_back(&mut self, pending: &PendingUndo) -> (usize, Option<usize>) {
        if pending.generation == self.list.generation() {
            match self.list.restore(&pending.removed) {
                Ok(index) => {
                    let header = pending
                        .removed
                        .header_removed()
                        .then_some(pending.removed.header_index);
                    return (index, header);
                }
                Err(error) => debug!(key = %pending.key, %error, "saved indices no longer fit"),
            }
        } else {
            debug!(key = %pending.key, "list changed since the delete, reinserting by store");
        }

        let placement = self.config.list.my_list_placement;
        let (index, header_inserted) = self.list.reinsert_item(pending.item.clone(), placement);
        (index, header_inserted.then(|| index - 1))
    }

    /// The host's undo affordance timed out.
    pub fn on_undo_expired(&mut self) -> Result<()> {
        self.confirm_pending_undo().map(|_| ())
    }

    /// Confirms the pending delete once its window has passed on the clock.
    pub fn on_tick(&mut self) -> Result<bool> {
        let due = self
            .session
            .pending_undo
            .as_ref()
            .is_some_and(|pending| pending.expires_at <= self.clock.now());
        if !due {
            return Ok(false);
        }
        self.confirm_pending_undo()
    }

    pub fn on_list_hidden(&mut self) -> Result<()> {
        self.session.visible = false;
        self.confirm_pending_undo().map(|_| ())
    }

    pub fn on_list_shown(&mut self) -> Result<ListChange> {
        self.session.visible = true;
        self.refresh_from_storage()
    }

    /// Makes the pending delete durable. Returns whether there was one.
    pub fn confirm_pending_undo(&mut self) -> Result<bool> {
        let Some(pending) = self.session.pending_undo.take() else {
            return Ok(false);
        };

        match self.storage.persist_delete(&pending.key) {
            Ok(()) => info!(key = %pending.key, "delete confirmed"),
            Err(error)
                if matches!(
                    error.downcast_ref::<StorageError>(),
                    Some(StorageError::MissingItem { .. })
                ) =>
            {
                warn!(key = %pending.key, "confirmed delete had no backing item");
            }
            Err(error) => {
                warn!(key = %pending.key, error = %format!("{error:#}"), "failed to persist delete");
                self.emit(Directive::ShowErrorNotice);
            }
        }

        self.session.animating.remove(&pending.key);
        self.emit(Directive::DismissUndoAffordance);
        self.after_undo_window(&pending)?;
        Ok(true)
    }

    fn after_undo_window(&mut self, pending: &PendingUndo) -> Result<()> {
        if pending.was_expired {
            self.evaluate_auto_delete(Trigger::SwipedExpiredItem)
                .context("failed to evaluate auto-delete after swipe")?;
        }
        Ok(())
    }
}
