use std::fmt;

use shoplist_core::auto_delete::DialogVariant;
use shoplist_core::grouped::{ListDiff, RowChange};
use shoplist_core::item::{ItemKey, ItemStatus};
use shoplist_core::row::Row;
use thiserror::Error;

/// Instructions for whatever is drawing the list.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    ShowUndoAffordance { row: Row },
    DismissUndoAffordance,
    ShowOnboardingDialog(DialogVariant),
    ShowPassiveNotice { count: u64 },
    ShowEmptyListNotice,
    ShowStatusNotice(ItemStatus),
    ShowErrorNotice,
    ConfirmMassDelete,
    MassDeleteCompleted { removed: usize },
    OpenItem(ItemKey),
    OpenSettings { highlight: bool },
    FocusRow(usize),
    RefreshRow(usize),
    RefreshRange { start: usize, len: usize },
    RowInserted(usize),
    RowRemoved(usize),
    RowMoved { from: usize, to: usize },
}

impl Directive {
    /// Row-level directives describing a rebuild, in application order.
    pub fn for_diff(diff: &ListDiff) -> Vec<Directive> {
        match diff {
            ListDiff::Unchanged => Vec::new(),
            ListDiff::Reload { len } => vec![Directive::RefreshRange {
                start: 0,
                len: *len,
            }],
            ListDiff::Changes(changes) => changes
                .iter()
                .map(|change| match *change {
                    RowChange::Inserted { index } => Directive::RowInserted(index),
                    RowChange::Removed { index } => Directive::RowRemoved(index),
                    RowChange::Updated { index } => Directive::RefreshRow(index),
                })
                .collect(),
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShowUndoAffordance { row } => match row.shopping_item() {
                Some(item) => write!(f, "undo available: '{}' removed", item.title),
                None => write!(f, "undo available: {} removed", row.kind()),
            },
            Self::DismissUndoAffordance => f.write_str("undo window closed"),
            Self::ShowOnboardingDialog(DialogVariant::Interact) => {
                f.write_str("dialog: expired items can be removed automatically")
            }
            Self::ShowOnboardingDialog(DialogVariant::MassDelete) => {
                f.write_str("dialog: let expired items clear themselves next time")
            }
            Self::ShowPassiveNotice { count } => {
                write!(f, "notice: {count} expired item(s) were removed automatically")
            }
            Self::ShowEmptyListNotice => f.write_str("notice: the list is already empty"),
            Self::ShowStatusNotice(status) => write!(f, "notice: item is {}", status.label()),
            Self::ShowErrorNotice => f.write_str("notice: something went wrong"),
            Self::ConfirmMassDelete => f.write_str("confirm: remove every item from the list?"),
            Self::MassDeleteCompleted { removed } => write!(f, "removed {removed} item(s)"),
            Self::OpenItem(key) => write!(f, "open item {key}"),
            Self::OpenSettings { highlight } => {
                if *highlight {
                    f.write_str("open settings (auto-delete highlighted)")
                } else {
                    f.write_str("open settings")
                }
            }
            Self::FocusRow(index) => write!(f, "focus row {index}"),
            Self::RefreshRow(index) => write!(f, "refresh row {index}"),
            Self::RefreshRange { start, len } => write!(f, "refresh rows {start}..{}", start + len),
            Self::RowInserted(index) => write!(f, "row inserted at {index}"),
            Self::RowRemoved(index) => write!(f, "row removed at {index}"),
            Self::RowMoved { from, to } => write!(f, "row moved {from} -> {to}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresentationError {
    #[error("presentation host unavailable: {reason}")]
    Unavailable { reason: String },
}

pub trait PresentationHost {
    fn present(&self, directive: Directive) -> Result<(), PresentationError>;
}

/// The user's answer to the onboarding dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingChoice {
    OpenSettings,
    NoThanks,
}
