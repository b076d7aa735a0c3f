pub mod cli;
pub mod dispatch;
pub mod host;
pub mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use shoplist_app::Collaborators;
use shoplist_app::sync::BackgroundRegroupLoader;
use shoplist_core::config::{load_config_or_default, resolve_config_dir};
use shoplist_core::settings::FileSettingsStore;
use shoplist_core::storage::FileStorage;
use shoplist_core::time::SystemClock;

use crate::cli::Cli;
use crate::host::ConsoleHost;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config_dir = resolve_config_dir()?;
    let config_path = config_dir.join("config.toml");
    let config = load_config_or_default(&config_path)
        .with_context(|| format!("failed to load config at {}", config_path.display()))?;

    let storage = FileStorage::in_dir(&config_dir);
    let settings = FileSettingsStore::in_dir(&config_dir);
    let console = ConsoleHost::new();
    let clock = SystemClock;
    let loader = BackgroundRegroupLoader::new();
    let collaborators = Collaborators {
        storage: &storage,
        settings: &settings,
        host: &console,
        clock: &clock,
        loader: &loader,
    };

    dispatch::run_with_deps(cli.command, collaborators, &console, config)
}
