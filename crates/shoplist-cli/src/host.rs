use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use shoplist_app::directives::{Directive, PresentationError, PresentationHost};

/// Prints each directive on its own line of stdout.
#[derive(Debug, Default)]
pub struct ConsoleHost {
    muted: AtomicBool,
}

impl ConsoleHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// While muted, row bookkeeping is dropped; notices and dialogs still print.
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }
}

impl PresentationHost for ConsoleHost {
    fn present(&self, directive: Directive) -> Result<(), PresentationError> {
        if self.muted.load(Ordering::Relaxed) && is_row_bookkeeping(&directive) {
            return Ok(());
        }

        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{directive}").map_err(|error| PresentationError::Unavailable {
            reason: error.to_string(),
        })
    }
}

fn is_row_bookkeeping(directive: &Directive) -> bool {
    matches!(
        directive,
        Directive::FocusRow(_)
            | Directive::RefreshRow(_)
            | Directive::RefreshRange { .. }
            | Directive::RowInserted(_)
            | Directive::RowRemoved(_)
            | Directive::RowMoved { .. }
    )
}
