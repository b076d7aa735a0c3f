//! Auto-delete retention setting, onboarding state, and the decision table
//! that turns list events into a dialog, a notice, or nothing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::item::{ItemKey, ShoppingItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoDeleteSetting {
    #[default]
    Off,
    Immediately,
    SevenDays,
    ThirtyDays,
}

impl AutoDeleteSetting {
    pub fn is_enabled(self) -> bool {
        self != Self::Off
    }

    /// How long an entry stays expired before the sweep removes it.
    pub fn retention(self) -> Option<Duration> {
        match self {
            Self::Off => None,
            Self::Immediately => Some(Duration::ZERO),
            Self::SevenDays => Some(Duration::days(7)),
            Self::ThirtyDays => Some(Duration::days(30)),
        }
    }

    /// The settings switch flips between off and immediate removal.
    pub fn toggled(self) -> Self {
        match self {
            Self::Off => Self::Immediately,
            Self::Immediately | Self::SevenDays | Self::ThirtyDays => Self::Off,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Immediately => "immediately",
            Self::SevenDays => "seven-days",
            Self::ThirtyDays => "thirty-days",
        }
    }
}

impl fmt::Display for AutoDeleteSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutoDeleteSetting {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "immediately" | "0" => Ok(Self::Immediately),
            "seven-days" | "7" => Ok(Self::SevenDays),
            "thirty-days" | "30" => Ok(Self::ThirtyDays),
            other => Err(format!(
                "unknown auto-delete setting '{other}' (expected off, immediately, seven-days or thirty-days)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingState {
    #[default]
    Init,
    Show,
    DoNotShow,
}

impl OnboardingState {
    pub fn may_show(self) -> bool {
        matches!(self, Self::Init | Self::Show)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogVariant {
    Interact,
    MassDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    PassiveSync,
    UserOpenedExpiredItem,
    /// The undo window for a swiped expired entry closed.
    SwipedExpiredItem,
    MassDeleteCompleted { expiry_driven: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyInputs {
    pub setting: AutoDeleteSetting,
    pub onboarding: OnboardingState,
    pub auto_delete_count: u64,
    /// Dialogs only appear on the main list while it is on screen.
    pub dialog_allowed: bool,
    pub notice_allowed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyAction {
    Nothing,
    PassiveNotice { count: u64 },
    OnboardingDialog(DialogVariant),
    ExpiredNotice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyDecision {
    pub action: PolicyAction,
    pub onboarding: Option<OnboardingState>,
    pub reset_count: bool,
}

impl PolicyDecision {
    fn nothing() -> Self {
        Self::action(PolicyAction::Nothing)
    }

    fn action(action: PolicyAction) -> Self {
        Self {
            action,
            onboarding: None,
            reset_count: false,
        }
    }

    fn dialog(variant: DialogVariant) -> Self {
        Self {
            action: PolicyAction::OnboardingDialog(variant),
            onboarding: Some(OnboardingState::DoNotShow),
            reset_count: false,
        }
    }
}

pub fn decide(trigger: Trigger, inputs: PolicyInputs) -> PolicyDecision {
    let dialog_eligible = inputs.dialog_allowed
        && inputs.onboarding.may_show()
        && !inputs.setting.is_enabled();

    match trigger {
        Trigger::PassiveSync => {
            if inputs.auto_delete_count > 0 && inputs.notice_allowed {
                PolicyDecision {
                    action: PolicyAction::PassiveNotice {
                        count: inputs.auto_delete_count,
                    },
                    onboarding: None,
                    reset_count: true,
                }
            } else {
                PolicyDecision::nothing()
            }
        }
        Trigger::UserOpenedExpiredItem => {
            if dialog_eligible {
                PolicyDecision::dialog(DialogVariant::Interact)
            } else {
                PolicyDecision::action(PolicyAction::ExpiredNotice)
            }
        }
        Trigger::SwipedExpiredItem => {
            if dialog_eligible {
                PolicyDecision::dialog(DialogVariant::Interact)
            } else {
                PolicyDecision::nothing()
            }
        }
        Trigger::MassDeleteCompleted { expiry_driven } => {
            if expiry_driven && dialog_eligible {
                PolicyDecision::dialog(DialogVariant::MassDelete)
            } else {
                PolicyDecision::nothing()
            }
        }
    }
}

/// Entries the background sweep should remove under `setting` at `now`.
pub fn sweep_candidates(
    items: &[ShoppingItem],
    setting: AutoDeleteSetting,
    now: OffsetDateTime,
) -> Vec<ItemKey> {
    let Some(retention) = setting.retention() else {
        return Vec::new();
    };

    items
        .iter()
        .filter(|item| {
            item.expired_for(now)
                .is_some_and(|expired_for| expired_for >= retention)
        })
        .filter_map(ShoppingItem::key)
        .collect()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::item::{Product, Store};

    fn inputs(setting: AutoDeleteSetting, onboarding: OnboardingState) -> PolicyInputs {
        PolicyInputs {
            setting,
            onboarding,
            auto_delete_count: 0,
            dialog_allowed: true,
            notice_allowed: true,
        }
    }

    #[test]
    fn passive_sync_reports_and_resets_a_positive_count() {
        let mut state = inputs(AutoDeleteSetting::SevenDays, OnboardingState::DoNotShow);
        state.auto_delete_count = 3;

        let decision = decide(Trigger::PassiveSync, state);
        assert_eq!(decision.action, PolicyAction::PassiveNotice { count: 3 });
        assert!(decision.reset_count);

        state.auto_delete_count = 0;
        assert_eq!(decide(Trigger::PassiveSync, state).action, PolicyAction::Nothing);
    }

    #[test]
    fn passive_notice_is_held_back_while_not_allowed() {
        let mut state = inputs(AutoDeleteSetting::Immediately, OnboardingState::Init);
        state.auto_delete_count = 2;
        state.notice_allowed = false;

        let decision = decide(Trigger::PassiveSync, state);
        assert_eq!(decision.action, PolicyAction::Nothing);
        assert!(!decision.reset_count);
    }

    #[test]
    fn opening_an_expired_item_shows_the_dialog_once_then_falls_back_to_a_notice() {
        for onboarding in [OnboardingState::Init, OnboardingState::Show] {
            let decision = decide(
                Trigger::UserOpenedExpiredItem,
                inputs(AutoDeleteSetting::Off, onboarding),
            );
            assert_eq!(
                decision.action,
                PolicyAction::OnboardingDialog(DialogVariant::Interact)
            );
            assert_eq!(decision.onboarding, Some(OnboardingState::DoNotShow));
        }

        let decision = decide(
            Trigger::UserOpenedExpiredItem,
            inputs(AutoDeleteSetting::Off, OnboardingState::DoNotShow),
        );
        assert_eq!(decision.action, PolicyAction::ExpiredNotice);
        assert_eq!(decision.onboarding, None);
    }

    #[test]
    fn enabled_setting_never_shows_the_dialog() {
        for setting in [
            AutoDeleteSetting::Immediately,
            AutoDeleteSetting::SevenDays,
            AutoDeleteSetting::ThirtyDays,
        ] {
            let state = inputs(setting, OnboardingState::Init);
            assert_eq!(
                decide(Trigger::UserOpenedExpiredItem, state).action,
                PolicyAction::ExpiredNotice
            );
            assert_eq!(
                decide(Trigger::MassDeleteCompleted { expiry_driven: true }, state).action,
                PolicyAction::Nothing
            );
            assert_eq!(decide(Trigger::SwipedExpiredItem, state).action, PolicyAction::Nothing);
        }
    }

    #[test]
    fn mass_delete_dialog_requires_expired_members() {
        let state = inputs(AutoDeleteSetting::Off, OnboardingState::Init);
        assert_eq!(
            decide(Trigger::MassDeleteCompleted { expiry_driven: false }, state).action,
            PolicyAction::Nothing
        );
        assert_eq!(
            decide(Trigger::MassDeleteCompleted { expiry_driven: true }, state).action,
            PolicyAction::OnboardingDialog(DialogVariant::MassDelete)
        );
    }

    #[test]
    fn hidden_or_embedded_lists_get_the_plain_notice() {
        let mut state = inputs(AutoDeleteSetting::Off, OnboardingState::Show);
        state.dialog_allowed = false;
        let decision = decide(Trigger::UserOpenedExpiredItem, state);
        assert_eq!(decision.action, PolicyAction::ExpiredNotice);
        assert_eq!(decision.onboarding, None);
    }

    #[test]
    fn settings_parse_and_toggle() {
        assert_eq!("seven-days".parse::<AutoDeleteSetting>(), Ok(AutoDeleteSetting::SevenDays));
        assert_eq!("30".parse::<AutoDeleteSetting>(), Ok(AutoDeleteSetting::ThirtyDays));
        assert!("weekly".parse::<AutoDeleteSetting>().is_err());
        assert_eq!(AutoDeleteSetting::Off.toggled(), AutoDeleteSetting::Immediately);
        assert_eq!(AutoDeleteSetting::ThirtyDays.toggled(), AutoDeleteSetting::Off);
    }

    #[test]
    fn sweep_honours_the_retention_window() {
        let now = datetime!(2026-05-20 12:00 UTC);
        let store = Store::new(1, "Grocer");
        let fresh = ShoppingItem::catalog(
            1,
            store.clone(),
            "fresh",
            Product::new(1).expiring_at(datetime!(2026-06-01 0:00 UTC)),
        );
        let recent = ShoppingItem::catalog(
            2,
            store.clone(),
            "recent",
            Product::new(2).expiring_at(datetime!(2026-05-18 0:00 UTC)),
        );
        let stale = ShoppingItem::catalog(
            3,
            store.clone(),
            "stale",
            Product::new(3).expiring_at(datetime!(2026-05-01 0:00 UTC)),
        );
        let manual = ShoppingItem::manual(store, "note to self");
        let items = vec![fresh, recent, stale, manual];

        assert!(sweep_candidates(&items, AutoDeleteSetting::Off, now).is_empty());
        assert_eq!(
            sweep_candidates(&items, AutoDeleteSetting::Immediately, now),
            vec![
                ItemKey::Durable(crate::item::ItemId(2)),
                ItemKey::Durable(crate::item::ItemId(3)),
            ]
        );
        assert_eq!(
            sweep_candidates(&items, AutoDeleteSetting::SevenDays, now),
            vec![ItemKey::Durable(crate::item::ItemId(3))]
        );
        assert!(sweep_candidates(&items, AutoDeleteSetting::ThirtyDays, now).is_empty());
    }
}
