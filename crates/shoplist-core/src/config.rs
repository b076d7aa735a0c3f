use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grouped::MyListPlacement;

pub const CONFIG_VERSION: u32 = 1;
pub const MIN_UNDO_WINDOW_SECS: u64 = 1;
pub const MAX_UNDO_WINDOW_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ShoplistConfig {
    pub version: u32,
    #[serde(default)]
    pub list: ListConfig,
    #[serde(default)]
    pub undo: UndoConfig,
    #[serde(default)]
    pub quantity: QuantityConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct ListConfig {
    #[serde(default)]
    pub my_list_placement: MyListPlacement,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UndoConfig {
    pub window_secs: u64,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self { window_secs: 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuantityConfig {
    pub min: u32,
    pub max: u32,
}

impl Default for QuantityConfig {
    fn default() -> Self {
        Self { min: 1, max: 999 }
    }
}

impl QuantityConfig {
    pub fn clamp(&self, value: i64) -> u32 {
        let clamped = value.clamp(i64::from(self.min), i64::from(self.max));
        u32::try_from(clamped).unwrap_or(self.max)
    }
}

impl Default for ShoplistConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            list: ListConfig::default(),
            undo: UndoConfig::default(),
            quantity: QuantityConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not resolve home directory for config path")]
    HomeDirectoryUnavailable,
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {message}")]
    Validation { message: String },
}

pub fn resolve_config_dir() -> anyhow::Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or(ConfigError::HomeDirectoryUnavailable)?;
    Ok(base_dirs.home_dir().join(".config").join("shoplist"))
}

pub fn resolve_config_path() -> anyhow::Result<PathBuf> {
    Ok(resolve_config_dir()?.join("config.toml"))
}

pub fn load_config(path: &Path) -> Result<ShoplistConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let parsed: ShoplistConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_config(&parsed)?;
    Ok(parsed)
}

/// Defaults apply when no config file exists; a present but broken file is an error.
pub fn load_config_or_default(path: &Path) -> Result<ShoplistConfig, ConfigError> {
    if !path.exists() {
        return Ok(ShoplistConfig::default());
    }
    load_config(path)
}

pub fn validate_config(config: &ShoplistConfig) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(ConfigError::Validation {
            message: format!("version must be {CONFIG_VERSION}"),
        });
    }

    let window = config.undo.window_secs;
    if !(MIN_UNDO_WINDOW_SECS..=MAX_UNDO_WINDOW_SECS).contains(&window) {
        return Err(ConfigError::Validation {
            message: format!(
                "undo.window_secs must be between {MIN_UNDO_WINDOW_SECS} and {MAX_UNDO_WINDOW_SECS}, found {window}"
            ),
        });
    }

    if config.quantity.min == 0 {
        return Err(ConfigError::Validation {
            message: "quantity.min must be at least 1 (0 means unset)".to_string(),
        });
    }

    if config.quantity.min > config.quantity.max {
        return Err(ConfigError::Validation {
            message: format!(
                "quantity.min ({}) must not exceed quantity.max ({})",
                config.quantity.min, config.quantity.max
            ),
        });
    }

    Ok(())
}
