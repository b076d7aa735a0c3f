use clap::{Parser, Subcommand, ValueEnum};
use shoplist_core::mass_delete::DeleteType;

#[derive(Debug, Parser)]
#[command(name = "shoplist")]
#[command(bin_name = "shoplist")]
#[command(version)]
#[command(about = "Shopping list grouped by store, with undoable deletes and auto-delete")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[arg(long, global = true, help = "Log engine activity at debug level")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(about = "Print the list grouped by store")]
    Show,
    #[command(about = "Swipe away the row at an index")]
    Delete {
        index: usize,
        #[arg(long, help = "Undo the delete before the session ends")]
        undo: bool,
    },
    #[command(about = "Remove all, checked, expired or checked-and-expired items")]
    Clear {
        #[arg(value_name = "TYPE")]
        delete_type: DeleteType,
        #[arg(long, help = "Confirm clearing every item")]
        yes: bool,
    },
    #[command(about = "Tick an item off")]
    Check {
        id: u64,
        #[arg(long, help = "Untick instead")]
        off: bool,
    },
    #[command(about = "Set an item's quantity; an empty value clears it")]
    Quantity {
        id: u64,
        #[arg(allow_hyphen_values = true)]
        value: String,
        #[arg(long)]
        unit: Option<String>,
    },
    #[command(about = "Set an item's note")]
    Note { id: u64, text: String },
    #[command(about = "Open an item")]
    Open { id: u64 },
    #[command(about = "Remove items expired past the auto-delete retention")]
    Sweep,
    #[command(about = "Choose an auto-delete retention, or `toggle` the switch")]
    AutoDelete {
        #[arg(value_name = "SETTING")]
        choice: String,
    },
    #[command(about = "Answer the auto-delete onboarding dialog")]
    Onboarding { answer: OnboardingAnswer },
    #[command(about = "Add a free-text item; store id 0 is My list")]
    Add {
        store_id: u64,
        store_name: String,
        title: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnboardingAnswer {
    Yes,
    No,
}
