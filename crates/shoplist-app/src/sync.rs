use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

use anyhow::{Context, Result};
use shoplist_core::auto_delete::Trigger;
use shoplist_core::grouped::{MyListPlacement, group_rows};
use shoplist_core::item::ShoppingItem;
use shoplist_core::row::Row;
use tracing::{debug, warn};

use crate::{ListChange, ShoppingListEngine};

#[derive(Debug)]
pub enum RegroupEvent {
    Done {
        token: u64,
        items: Vec<ShoppingItem>,
        rows: Vec<Row>,
    },
}

/// Turns a flat item set into rows away from the owner of the live list.
pub trait RegroupLoader: Send + Sync {
    fn spawn_regroup(
        &self,
        items: Vec<ShoppingItem>,
        placement: MyListPlacement,
        token: u64,
    ) -> Receiver<RegroupEvent>;
}

/// Regroups on the rayon pool.
#[derive(Debug, Default)]
pub struct BackgroundRegroupLoader;

impl BackgroundRegroupLoader {
    pub fn new() -> Self {
        Self
    }
}

impl RegroupLoader for BackgroundRegroupLoader {
    fn spawn_regroup(
        &self,
        items: Vec<ShoppingItem>,
        placement: MyListPlacement,
        token: u64,
    ) -> Receiver<RegroupEvent> {
        let (sender, receiver) = mpsc::channel();
        rayon::spawn(move || {
            let rows = group_rows(items.clone(), placement);
            let _ = sender.send(RegroupEvent::Done {
                token,
                items,
                rows,
            });
        });
        receiver
    }
}

/// Regroups before returning; the result is ready on the first poll.
#[derive(Debug, Default)]
pub struct InlineRegroupLoader;

impl RegroupLoader for InlineRegroupLoader {
    fn spawn_regroup(
        &self,
        items: Vec<ShoppingItem>,
        placement: MyListPlacement,
        token: u64,
    ) -> Receiver<RegroupEvent> {
        let (sender, receiver) = mpsc::channel();
        let rows = group_rows(items.clone(), placement);
        let _ = sender.send(RegroupEvent::Done {
            token,
            items,
            rows,
        });
        receiver
    }
}

#[derive(Debug)]
pub(crate) struct RegroupState {
    active_token: Option<u64>,
    next_token: u64,
    receiver: Option<Receiver<RegroupEvent>>,
}

impl Default for RegroupState {
    fn default() -> Self {
        Self {
            active_token: None,
            next_token: 1,
            receiver: None,
        }
    }
}

impl RegroupState {
    fn clear(&mut self) {
        self.active_token = None;
        self.receiver = None;
    }
}

impl<'a> ShoppingListEngine<'a> {
    /// A background sync delivered the current active items.
    pub fn on_sync_received(&mut self, items: Vec<ShoppingItem>) -> Result<ListChange> {
        if self.session.modify_disabled {
            debug!(items = items.len(), "sync arrived mid-drag, queued until the drag ends");
            self.session.queued_sync = Some(items);
            return Ok(ListChange::Queued);
        }

        let token = self.regroup.next_token;
        self.regroup.next_token = self.regroup.next_token.saturating_add(1);
        self.regroup.active_token = Some(token);
        self.regroup.receiver = Some(self.loader.spawn_regroup(
            items,
            self.config.list.my_list_placement,
            token,
        ));
        debug!(token, "regroup started");

        Ok(match self.poll_regroup()? {
            Some(change) => change,
            None => ListChange::Pending { token },
        })
    }

    pub fn refresh_from_storage(&mut self) -> Result<ListChange> {
        let items = self
            .storage
            .query_active_items()
            .context("failed to load shopping list items")?;
        self.on_sync_received(items)
    }

    pub fn has_regroup_in_flight(&self) -> bool {
        self.regroup.receiver.is_some()
    }

    /// Applies the newest regroup result if it has arrived. Never blocks.
    pub fn poll_regroup(&mut self) -> Result<Option<ListChange>> {
        let Some(receiver) = &self.regroup.receiver else {
            return Ok(None);
        };

        match receiver.try_recv() {
            Ok(event) => self.apply_regroup_event(event),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                warn!("regroup worker stopped without a result");
                self.regroup.clear();
                Ok(None)
            }
        }
    }

    /// Waits up to `timeout` for the regroup in flight, for hosts without an event loop.
    pub fn await_regroup(&mut self, timeout: Duration) -> Result<Option<ListChange>> {
        let Some(receiver) = &self.regroup.receiver else {
            return Ok(None);
        };

        match receiver.recv_timeout(timeout) {
            Ok(event) => self.apply_regroup_event(event),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                warn!("regroup worker stopped without a result");
                self.regroup.clear();
                Ok(None)
            }
        }
    }

    fn apply_regroup_event(&mut self, event: RegroupEvent) -> Result<Option<ListChange>> {
        let RegroupEvent::Done { token, items, rows } = event;
        if Some(token) != self.regroup.active_token {
            debug!(token, "discarding superseded regroup");
            return Ok(None);
        }
        self.regroup.clear();

        if self.session.modify_disabled {
            debug!(token, "regroup finished mid-drag, queued until the drag ends");
            self.session.queued_sync = Some(items);
            return Ok(Some(ListChange::Queued));
        }

        let pending_shown = self.session.pending_undo.as_ref().is_some_and(|pending| {
            items.iter().any(|item| item.matches_key(&pending.key))
        });
        let rows = if pending_shown {
            group_rows(
                self.without_pending_undo(items),
                self.config.list.my_list_placement,
            )
        } else {
            rows
        };

        let mode = self.diff_mode();
        let diff = self.list.replace_rows(rows, mode);
        self.emit_diff(&diff);
        debug!(token, rows = self.list.len(), "regroup applied");

        self.evaluate_auto_delete(Trigger::PassiveSync)
            .context("failed to evaluate auto-delete after sync")?;
        Ok(Some(ListChange::Rebuilt(diff)))
    }
}
