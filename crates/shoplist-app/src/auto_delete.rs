use anyhow::{Context, Result};
use shoplist_core::auto_delete::{AutoDeleteSetting, OnboardingState, sweep_candidates};
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::directives::{Directive, OnboardingChoice};
use crate::ShoppingListEngine;

impl<'a> ShoppingListEngine<'a> {
    /// Answer from the onboarding dialog. The dialog already stored
    /// `DoNotShow` when it was shown.
    pub fn on_onboarding_choice(&self, choice: OnboardingChoice) {
        match choice {
            OnboardingChoice::OpenSettings => self.emit(Directive::OpenSettings { highlight: true }),
            OnboardingChoice::NoThanks => debug!("auto-delete onboarding dismissed"),
        }
    }

    /// The settings switch: flips between off and immediate removal.
    pub fn toggle_auto_delete(&self) -> Result<AutoDeleteSetting> {
        let current = self
            .settings
            .auto_delete_setting()
            .context("failed to read auto-delete setting")?;
        let next = current.toggled();
        self.select_auto_delete(next)?;
        Ok(next)
    }

    pub fn select_auto_delete(&self, setting: AutoDeleteSetting) -> Result<()> {
        self.settings
            .set_auto_delete_setting(setting)
            .context("failed to store auto-delete setting")?;
        self.settings
            .set_onboarding_state(OnboardingState::DoNotShow)
            .context("failed to store onboarding state")?;
        info!(%setting, "auto-delete setting changed");
        Ok(())
    }

    /// Removes entries that have been expired for longer than the retention
    /// window and adds them to the count the next sync reports.
    pub fn run_expiry_sweep(&mut self, now: OffsetDateTime) -> Result<usize> {
        let setting = self
            .settings
            .auto_delete_setting()
            .context("failed to read auto-delete setting")?;
        let items = self
            .storage
            .query_active_items()
            .context("failed to load shopping list items")?;

        let candidates = sweep_candidates(&items, setting, now);
        if candidates.is_empty() {
            debug!(%setting, "expiry sweep found nothing to remove");
            return Ok(0);
        }

        let removed = self
            .storage
            .persist_bulk_delete(&candidates)
            .context("failed to remove expired items")?;
        let count = self
            .settings
            .increment_auto_delete_count(u64::try_from(removed).unwrap_or(u64::MAX))
            .context("failed to update auto-delete count")?;
        info!(%setting, removed, count, "expiry sweep removed items");

        let remaining: Vec<_> = items
            .into_iter()
            .filter(|item| !candidates.iter().any(|key| item.matches_key(key)))
            .collect();
        if self.session.modify_disabled {
            self.session.queued_sync = Some(remaining);
        } else {
            self.rebuild_now(remaining);
        }
        Ok(removed)
    }

    /// Sweeps with the engine's clock.
    pub fn run_expiry_sweep_now(&mut self) -> Result<usize> {
        let now = self.clock.now();
        self.run_expiry_sweep(now)
    }
}

