#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use shoplist_core::item::{Product, ShoppingItem, Store};
use shoplist_core::storage::FileStorage;
use time::{Duration, OffsetDateTime};

pub fn new_command_with_temp_home() -> (Command, tempfile::TempDir) {
    let temp_home = tempfile::tempdir().expect("temp home");
    (command_in(temp_home.path()), temp_home)
}

pub fn command_in(home: &Path) -> Command {
    let binary = assert_cmd::cargo::cargo_bin!("shoplist");
    let mut command = Command::new(binary);
    command.env("HOME", home);
    command.env("XDG_CONFIG_HOME", home.join(".config"));
    command.env_remove("SHOPLIST_LOG");
    command
}

pub fn config_dir(home: &Path) -> PathBuf {
    home.join(".config").join("shoplist")
}

pub fn seed_list(home: &Path, items: Vec<ShoppingItem>) {
    FileStorage::in_dir(&config_dir(home))
        .seed(items)
        .expect("seed list");
}

pub fn write_config(home: &Path, contents: &str) {
    let dir = config_dir(home);
    fs::create_dir_all(&dir).expect("create config dir");
    fs::write(dir.join("config.toml"), contents).expect("write config");
}

pub fn read_settings(home: &Path) -> String {
    fs::read_to_string(config_dir(home).join("settings.toml")).expect("read settings")
}

pub fn catalog(id: u64, store_id: u64, store: &str, title: &str) -> ShoppingItem {
    ShoppingItem::catalog(id, Store::new(store_id, store), title, Product::new(id))
}

/// Expired ten days ago, so even the seven-day retention removes it.
pub fn stale(id: u64, store_id: u64, store: &str, title: &str) -> ShoppingItem {
    let expires_at = OffsetDateTime::now_utc() - Duration::days(10);
    ShoppingItem::catalog(
        id,
        Store::new(store_id, store),
        title,
        Product::new(id).expiring_at(expires_at),
    )
}
