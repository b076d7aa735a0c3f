use std::time::Duration;

use anyhow::{Context, Result, bail};
use comfy_table::{Cell, ContentArrangement, Table};
use shoplist_app::directives::OnboardingChoice;
use shoplist_app::{Collaborators, ListChange, ListSource, ShoppingListEngine};
use shoplist_core::auto_delete::AutoDeleteSetting;
use shoplist_core::config::ShoplistConfig;
use shoplist_core::item::{ItemId, ItemKey, ShoppingItem, Store};
use shoplist_core::mass_delete::DeleteType;
use shoplist_core::row::Row;
use time::OffsetDateTime;
use tracing::debug;

use crate::cli::{Command, OnboardingAnswer};
use crate::host::ConsoleHost;

const REGROUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs one command as a complete list session: load, apply, hide.
pub fn run_with_deps(
    command: Command,
    collaborators: Collaborators<'_>,
    console: &ConsoleHost,
    config: ShoplistConfig,
) -> Result<()> {
    let now = collaborators.clock.now();
    let mut engine = ShoppingListEngine::new(collaborators, config, ListSource::Main);

    console.set_muted(true);
    let loaded = load_list(&mut engine);
    console.set_muted(false);
    loaded?;

    let outcome = apply_command(command, &mut engine, now);
    let closed = engine
        .on_list_hidden()
        .context("failed to close the list session");
    outcome.and(closed)
}

fn load_list(engine: &mut ShoppingListEngine<'_>) -> Result<()> {
    if let ListChange::Pending { token } = engine.refresh_from_storage()? {
        debug!(token, "waiting for regroup");
        if engine.await_regroup(REGROUP_TIMEOUT)?.is_none() {
            bail!("timed out grouping the shopping list");
        }
    }
    Ok(())
}

fn apply_command(
    command: Command,
    engine: &mut ShoppingListEngine<'_>,
    now: OffsetDateTime,
) -> Result<()> {
    match command {
        Command::Show => {
            print_list(engine.rows(), now);
            Ok(())
        }
        Command::Delete { index, undo } => {
            engine
                .on_swipe_delete(index)
                .with_context(|| format!("failed to delete row {index}"))?;
            if undo {
                engine.on_undo_requested().context("failed to undo delete")?;
            }
            Ok(())
        }
        Command::Clear { delete_type, yes } => run_clear(engine, delete_type, yes),
        Command::Check { id, off } => {
            engine
                .on_item_checked(&durable(id), !off)
                .with_context(|| format!("failed to update item {id}"))?;
            Ok(())
        }
        Command::Quantity { id, value, unit } => {
            engine
                .on_quantity_edited(&durable(id), &value, unit.as_deref())
                .with_context(|| format!("failed to set quantity of item {id}"))?;
            Ok(())
        }
        Command::Note { id, text } => {
            engine
                .on_note_edited(&durable(id), &text)
                .with_context(|| format!("failed to set note of item {id}"))?;
            Ok(())
        }
        Command::Open { id } => {
            engine
                .on_item_opened(&durable(id))
                .with_context(|| format!("failed to open item {id}"))?;
            Ok(())
        }
        Command::Sweep => {
            let removed = engine.run_expiry_sweep_now()?;
            println!("Swept {removed} expired item(s).");
            Ok(())
        }
        Command::AutoDelete { choice } => run_auto_delete(engine, &choice),
        Command::Onboarding { answer } => {
            engine.on_onboarding_choice(match answer {
                OnboardingAnswer::Yes => OnboardingChoice::OpenSettings,
                OnboardingAnswer::No => OnboardingChoice::NoThanks,
            });
            Ok(())
        }
        Command::Add {
            store_id,
            store_name,
            title,
        } => {
            let store = if store_id == 0 {
                Store::my_list()
            } else {
                Store::new(store_id, store_name)
            };
            engine
                .on_manual_item_added(ShoppingItem::manual(store, title))
                .context("failed to add item")?;
            Ok(())
        }
    }
}

fn run_clear(
    engine: &mut ShoppingListEngine<'_>,
    delete_type: DeleteType,
    yes: bool,
) -> Result<()> {
    engine
        .on_mass_delete_requested(delete_type)
        .with_context(|| format!("failed to clear {delete_type} items"))?;
    if !engine.session().is_awaiting_mass_delete() {
        return Ok(());
    }

    if !yes {
        engine.on_mass_delete_cancelled();
        bail!("clearing every item needs --yes");
    }
    engine
        .on_mass_delete_confirmed()
        .context("failed to clear the list")?;
    Ok(())
}

fn run_auto_delete(engine: &mut ShoppingListEngine<'_>, choice: &str) -> Result<()> {
    let setting = if choice.eq_ignore_ascii_case("toggle") {
        engine.toggle_auto_delete()?
    } else {
        let setting: AutoDeleteSetting = choice.parse().map_err(anyhow::Error::msg)?;
        engine.select_auto_delete(setting)?;
        setting
    };
    println!("Auto-delete: {setting}");
    Ok(())
}

fn durable(id: u64) -> ItemKey {
    ItemKey::Durable(ItemId(id))
}

fn print_list(rows: &[Row], now: OffsetDateTime) {
    if rows.iter().all(Row::is_footer) {
        println!("The list is empty.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Row", "Id", "Item", "Quantity", "Note", "Status"]);

    for (index, row) in rows.iter().enumerate() {
        match row {
            Row::Header { store } => {
                table.add_row(vec![
                    Cell::new(index),
                    Cell::new(""),
                    Cell::new(format!("[{}]", store.name)),
                    Cell::new(""),
                    Cell::new(""),
                    Cell::new(""),
                ]);
            }
            Row::Item { item } | Row::ManualItem { item } => {
                let id = item
                    .id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let quantity = if item.quantity == 0 {
                    String::new()
                } else {
                    format!("{} {}", item.quantity, item.quantity_unit)
                };
                let mut status = item.status(now).label().to_string();
                if item.checked {
                    status.push_str(", checked");
                }

                table.add_row(vec![
                    Cell::new(index),
                    Cell::new(id),
                    Cell::new(item.title.as_str()),
                    Cell::new(quantity),
                    Cell::new(item.note.as_str()),
                    Cell::new(status),
                ]);
            }
            Row::Footer => {}
        }
    }

    println!("{table}");
}
