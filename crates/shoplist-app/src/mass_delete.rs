use anyhow::{Context, Result};
use shoplist_core::auto_delete::Trigger;
use shoplist_core::mass_delete::{DeleteType, MIN_ROWS_FOR_MASS_DELETE, classify};
use tracing::{debug, info, warn};

use crate::directives::Directive;
use crate::{ListChange, QueuedMutation, ShoppingListEngine};

impl<'a> ShoppingListEngine<'a> {
    /// Clears entries matching `delete_type`. Clearing everything waits for
    /// [`ShoppingListEngine::on_mass_delete_confirmed`].
    pub fn on_mass_delete_requested(&mut self, delete_type: DeleteType) -> Result<ListChange> {
        if self.session.modify_disabled {
            return Ok(self.queue_mutation(QueuedMutation::MassDelete(delete_type)));
        }

        if self.list.len() < MIN_ROWS_FOR_MASS_DELETE {
            self.emit(Directive::ShowEmptyListNotice);
            return Ok(ListChange::None);
        }

        if delete_type.requires_confirmation() {
            self.session.awaiting_mass_delete = true;
            self.emit(Directive::ConfirmMassDelete);
            return Ok(ListChange::None);
        }

        self.perform_mass_delete(delete_type)
    }

    pub fn on_mass_delete_confirmed(&mut self) -> Result<ListChange> {
        if !self.session.awaiting_mass_delete {
            debug!("mass delete confirmation with no request outstanding");
            return Ok(ListChange::None);
        }
        if self.session.modify_disabled {
            return Ok(self.queue_mutation(QueuedMutation::ConfirmMassDelete));
        }
        self.session.awaiting_mass_delete = false;
        self.perform_mass_delete(DeleteType::All)
    }

    pub fn on_mass_delete_cancelled(&mut self) {
        self.session.awaiting_mass_delete = false;
        self.session
            .queued_mutations
            .retain(|mutation| !matches!(mutation, QueuedMutation::ConfirmMassDelete));
    }

    fn perform_mass_delete(&mut self, delete_type: DeleteType) -> Result<ListChange> {
        self.confirm_pending_undo()?;

        if self.list.len() < MIN_ROWS_FOR_MASS_DELETE {
            self.emit(Directive::ShowEmptyListNotice);
            return Ok(ListChange::None);
        }

        let selection = classify(delete_type, self.list.rows(), self.clock.now());
        if selection.is_empty() {
            debug!(%delete_type, "nothing matched the mass delete");
            return Ok(ListChange::None);
        }

        if let Err(error) = self.storage.persist_bulk_delete(&selection.keys) {
            warn!(%delete_type, error = %format!("{error:#}"), "bulk delete failed");
            self.emit(Directive::ShowErrorNotice);
            return Ok(ListChange::None);
        }

        self.session.animating.clear();
        let remaining = self
            .shown_items()
            .into_iter()
            .filter(|item| !selection.keys.iter().any(|key| item.matches_key(key)))
            .collect();
        let diff = self.rebuild_now(remaining);

        info!(
            %delete_type,
            removed = selection.len(),
            contains_expired = selection.contains_expired,
            "mass delete completed"
        );
        self.emit(Directive::MassDeleteCompleted {
            removed: selection.len(),
        });
        self.evaluate_auto_delete(Trigger::MassDeleteCompleted {
            expiry_driven: selection.contains_expired,
        })
        .context("failed to evaluate auto-delete after mass delete")?;

        Ok(ListChange::Rebuilt(diff))
    }
}
