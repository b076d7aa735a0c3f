use std::collections::HashSet;

use anyhow::{Context, Result};
use shoplist_core::auto_delete::{PolicyAction, PolicyInputs, Trigger, decide};
use shoplist_core::config::ShoplistConfig;
use shoplist_core::grouped::{DiffMode, GroupedList, ListDiff};
use shoplist_core::item::{ItemKey, ItemStatus, ShoppingItem};
use shoplist_core::mass_delete::DeleteType;
use shoplist_core::row::Row;
use shoplist_core::settings::SettingsStore;
use shoplist_core::storage::{Storage, StorageError};
use shoplist_core::time::Clock;
use thiserror::Error;
use tracing::{debug, warn};

pub mod auto_delete;
pub mod delete;
pub mod directives;
pub mod drag;
pub mod item;
pub mod mass_delete;
pub mod sync;

use crate::delete::PendingUndo;
use crate::directives::{Directive, PresentationHost};
use crate::drag::DragState;
use crate::sync::{RegroupLoader, RegroupState};

/// Everything the engine talks to but does not own.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub storage: &'a dyn Storage,
    pub settings: &'a dyn SettingsStore,
    pub host: &'a dyn PresentationHost,
    pub clock: &'a dyn Clock,
    pub loader: &'a dyn RegroupLoader,
}

/// Which surface the engine backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListSource {
    #[default]
    Main,
    Embedded,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("no row in the list refers to {key}")]
    UnknownItem { key: ItemKey },
    #[error("quantity '{input}' is not a whole number")]
    InvalidQuantity { input: String },
    #[error("'{title}' is not a manual item")]
    NotManual { title: String },
}

/// What a structural call did to the row sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListChange {
    None,
    Removed {
        index: usize,
        header: Option<usize>,
    },
    Inserted {
        index: usize,
        header: Option<usize>,
    },
    Moved {
        index: usize,
        removed_header: Option<usize>,
    },
    Updated {
        index: usize,
    },
    Rebuilt(ListDiff),
    /// A regroup was started and will be applied when its result arrives.
    Pending {
        token: u64,
    },
    /// Held back until the drag in progress ends.
    Queued,
}

/// Per-session state that the list surface would otherwise keep globally.
#[derive(Debug, Default)]
pub struct ListSession {
    pub visible: bool,
    pub modify_disabled: bool,
    pub(crate) pending_undo: Option<PendingUndo>,
    pub(crate) awaiting_mass_delete: bool,
    pub(crate) queued_sync: Option<Vec<ShoppingItem>>,
    pub(crate) queued_mutations: Vec<QueuedMutation>,
    pub(crate) drag: Option<DragState>,
    pub(crate) animating: HashSet<ItemKey>,
}

impl ListSession {
    pub fn has_pending_undo(&self) -> bool {
        self.pending_undo.is_some()
    }

    pub fn has_queued_sync(&self) -> bool {
        self.queued_sync.is_some()
    }

    pub fn is_awaiting_mass_delete(&self) -> bool {
        self.awaiting_mass_delete
    }

    pub fn has_pending_animations(&self) -> bool {
        !self.animating.is_empty()
    }

    pub fn queued_mutation_count(&self) -> usize {
        self.queued_mutations.len()
    }
}

/// A structural request that arrived mid-drag.
#[derive(Debug, Clone)]
pub(crate) enum QueuedMutation {
    Swipe(ItemKey),
    Undo,
    MassDelete(DeleteType),
    ConfirmMassDelete,
    AddManual(ShoppingItem),
}

pub struct ShoppingListEngine<'a> {
    storage: &'a dyn Storage,
    settings: &'a dyn SettingsStore,
    host: &'a dyn PresentationHost,
    clock: &'a dyn Clock,
    loader: &'a dyn RegroupLoader,
    config: ShoplistConfig,
    source: ListSource,
    list: GroupedList,
    session: ListSession,
    regroup: RegroupState,
}

impl<'a> ShoppingListEngine<'a> {
    pub fn new(collaborators: Collaborators<'a>, config: ShoplistConfig, source: ListSource) -> Self {
        Self {
            storage: collaborators.storage,
            settings: collaborators.settings,
            host: collaborators.host,
            clock: collaborators.clock,
            loader: collaborators.loader,
            config,
            source,
            list: GroupedList::new(),
            session: ListSession {
                visible: true,
                ..ListSession::default()
            },
            regroup: RegroupState::default(),
        }
    }

    pub fn rows(&self) -> &[Row] {
        self.list.rows()
    }

    pub fn list(&self) -> &GroupedList {
        &self.list
    }

    pub fn session(&self) -> &ListSession {
        &self.session
    }

    pub fn config(&self) -> &ShoplistConfig {
        &self.config
    }

    pub fn source(&self) -> ListSource {
        self.source
    }

    /// Host signal that every running row animation has settled.
    pub fn on_animations_finished(&mut self) {
        self.session.animating.clear();
    }

    pub(crate) fn emit(&self, directive: Directive) {
        debug!(%directive, "presenting");
        if let Err(error) = self.host.present(directive) {
            warn!(%error, "dropping directive the host could not show");
        }
    }

    pub(crate) fn emit_diff(&self, diff: &ListDiff) {
        for directive in Directive::for_diff(diff) {
            self.emit(directive);
        }
    }

    pub(crate) fn diff_mode(&self) -> DiffMode {
        if self.session.has_pending_animations() {
            DiffMode::Granular
        } else {
            DiffMode::Coalesce
        }
    }

    /// Every entry currently shown, in row order.
    pub(crate) fn shown_items(&self) -> Vec<ShoppingItem> {
        self.list
            .rows()
            .iter()
            .filter_map(Row::shopping_item)
            .cloned()
            .collect()
    }

    /// Rebuilds the rows on this thread and reports the result to the host.
    pub(crate) fn rebuild_now(&mut self, items: Vec<ShoppingItem>) -> ListDiff {
        let items = self.without_pending_undo(items);
        let mode = self.diff_mode();
        let diff = self
            .list
            .rebuild(items, self.config.list.my_list_placement, mode);
        self.emit_diff(&diff);
        diff
    }

    pub(crate) fn without_pending_undo(&self, items: Vec<ShoppingItem>) -> Vec<ShoppingItem> {
        let Some(pending) = &self.session.pending_undo else {
            return items;
        };
        items
            .into_iter()
            .filter(|item| !item.matches_key(&pending.key))
            .collect()
    }

    pub(crate) fn policy_inputs(&self) -> Result<PolicyInputs> {
        let visible = self.session.visible;
        Ok(PolicyInputs {
            setting: self
                .settings
                .auto_delete_setting()
                .context("failed to read auto-delete setting")?,
            onboarding: self
                .settings
                .onboarding_state()
                .context("failed to read onboarding state")?,
            auto_delete_count: self
                .settings
                .auto_delete_count()
                .context("failed to read auto-delete count")?,
            dialog_allowed: self.source == ListSource::Main && visible,
            notice_allowed: self.source == ListSource::Embedded || visible,
        })
    }

    /// Runs the auto-delete decision for `trigger` and carries it out.
    pub fn evaluate_auto_delete(&self, trigger: Trigger) -> Result<PolicyAction> {
        let decision = decide(trigger, self.policy_inputs()?);

        if let Some(state) = decision.onboarding {
            self.settings
                .set_onboarding_state(state)
                .context("failed to store onboarding state")?;
        }
        if decision.reset_count {
            self.settings
                .reset_auto_delete_count()
                .context("failed to reset auto-delete count")?;
        }

        debug!(?trigger, action = ?decision.action, "auto-delete decision");
        match decision.action {
            PolicyAction::Nothing => {}
            PolicyAction::PassiveNotice { count } => {
                self.emit(Directive::ShowPassiveNotice { count });
            }
            PolicyAction::OnboardingDialog(variant) => {
                self.emit(Directive::ShowOnboardingDialog(variant));
            }
            PolicyAction::ExpiredNotice => {
                self.emit(Directive::ShowStatusNotice(ItemStatus::Expired));
            }
        }
        Ok(decision.action)
    }

    /// Recovers from a storage write that failed for the entry behind `key`.
    ///
    /// A record that no longer exists takes its row with it; anything else
    /// leaves the list alone and shows the generic error notice.
    pub(crate) fn recover_storage_failure(
        &mut self,
        key: &ItemKey,
        error: anyhow::Error,
    ) -> Result<ListChange> {
        let missing = matches!(
            error.downcast_ref::<StorageError>(),
            Some(StorageError::MissingItem { .. })
        );
        if !missing {
            warn!(%key, error = %format!("{error:#}"), "storage write failed");
            self.emit(Directive::ShowErrorNotice);
            return Ok(ListChange::None);
        }

        warn!(%key, "row has no backing item, dropping it");
        let Some(index) = self.list.position_of(key) else {
            return Ok(ListChange::None);
        };
        let removed = self.list.remove_with_collapse(index)?;
        self.emit(Directive::RowRemoved(index));
        if removed.header_removed() {
            self.emit(Directive::RowRemoved(removed.header_index));
        }
        Ok(ListChange::Removed {
            index,
            header: removed.header_removed().then_some(removed.header_index),
        })
    }

    pub(crate) fn index_of(&self, key: &ItemKey) -> Result<usize> {
        self.list
            .position_of(key)
            .ok_or_else(|| EngineError::UnknownItem { key: *key }.into())
    }

    pub(crate) fn queue_mutation(&mut self, mutation: QueuedMutation) -> ListChange {
        debug!(?mutation, "row is being dragged, holding the request");
        self.session.queued_mutations.push(mutation);
        ListChange::Queued
    }
}
