use anyhow::Result;
use shoplist_core::item::ItemKey;
use tracing::{debug, info};

use crate::directives::Directive;
use crate::{ListChange, QueuedMutation, ShoppingListEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DragState {
    pub(crate) key: ItemKey,
    pub(crate) original: usize,
}

impl<'a> ShoppingListEngine<'a> {
    /// Drag started or ended. Ending a drag applies any sync held back
    /// meanwhile, then replays queued structural requests in arrival order.
    /// Returns the last change applied.
    pub fn on_drag_state_changed(&mut self, dragging: bool) -> Result<ListChange> {
        self.session.modify_disabled = dragging;
        if dragging {
            return Ok(ListChange::None);
        }

        if let Some(drag) = self.session.drag {
            debug!(original = drag.original, "drag ended without a drop, settling it");
            self.on_drag_move_completed(drag.original)?;
        }

        let synced = match self.session.queued_sync.take() {
            Some(items) => Some(self.on_sync_received(items)?),
            None => None,
        };
        let replayed = self.replay_queued_mutations()?;
        Ok(replayed.or(synced).unwrap_or(ListChange::None))
    }

    fn replay_queued_mutations(&mut self) -> Result<Option<ListChange>> {
        let mut last = None;
        for mutation in std::mem::take(&mut self.session.queued_mutations) {
            debug!(?mutation, "replaying request held during the drag");
            let change = match mutation {
                QueuedMutation::Swipe(key) => match self.list.position_of(&key) {
                    Some(index) => self.on_swipe_delete(index)?,
                    None => {
                        debug!(%key, "queued swipe target is gone");
                        continue;
                    }
                },
                QueuedMutation::Undo => self.on_undo_requested()?,
                QueuedMutation::MassDelete(delete_type) => {
                    self.on_mass_delete_requested(delete_type)?
                }
                QueuedMutation::ConfirmMassDelete => self.on_mass_delete_confirmed()?,
                QueuedMutation::AddManual(item) => self.on_manual_item_added(item)?,
            };
            last = Some(change);
        }
        Ok(last)
    }

    /// Live feedback while dragging: the row at `from` now sits at `to`.
    pub fn on_row_moved(&mut self, from: usize, to: usize) -> Result<usize> {
        let key = self.list.row_at(from)?.item_key();
        let landed = self.list.move_row(from, to)?;

        if let (None, Some(key)) = (self.session.drag, key) {
            self.session.drag = Some(DragState {
                key,
                original: from,
            });
        }

        self.emit(Directive::RowMoved { from, to: landed });
        Ok(landed)
    }

    /// The drop landed. `from` is where the row was when the drag began.
    pub fn on_drag_move_completed(&mut self, from: usize) -> Result<ListChange> {
        let Some(drag) = self.session.drag.take() else {
            return Ok(ListChange::None);
        };
        if drag.original != from {
            debug!(
                reported = from,
                recorded = drag.original,
                "drop reported a different origin, using the recorded one"
            );
        }

        let Some(landed) = self.list.position_of(&drag.key) else {
            return Ok(ListChange::None);
        };
        let relocation = self.list.settle_move(drag.original, landed);

        if let Some(header_index) = relocation.removed_header {
            self.emit(Directive::RowRemoved(header_index));
        }
        self.emit(Directive::RefreshRow(relocation.index));

        let Some(store) = self
            .list
            .row_at(relocation.index)?
            .shopping_item()
            .map(|item| item.store.clone())
        else {
            return Ok(ListChange::None);
        };

        if let Err(error) = self
            .storage
            .persist_move(&drag.key, &store, relocation.position)
        {
            return self.recover_storage_failure(&drag.key, error);
        }

        info!(key = %drag.key, store = %store.name, position = relocation.position, "row moved");
        Ok(ListChange::Moved {
            index: relocation.index,
            removed_header: relocation.removed_header,
        })
    }
}
