use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auto_delete::{AutoDeleteSetting, OnboardingState};

const SETTINGS_VERSION: i64 = 1;

/// Per-user auto-delete preferences and the running removal count.
pub trait SettingsStore {
    fn auto_delete_setting(&self) -> anyhow::Result<AutoDeleteSetting>;

    fn set_auto_delete_setting(&self, setting: AutoDeleteSetting) -> anyhow::Result<()>;

    fn onboarding_state(&self) -> anyhow::Result<OnboardingState>;

    fn set_onboarding_state(&self, state: OnboardingState) -> anyhow::Result<()>;

    fn auto_delete_count(&self) -> anyhow::Result<u64>;

    /// Returns the count after adding `by`.
    fn increment_auto_delete_count(&self, by: u64) -> anyhow::Result<u64>;

    /// Returns the count as it was before the reset.
    fn reset_auto_delete_count(&self) -> anyhow::Result<u64>;
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to write settings at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize settings: {0}")]
    Serialize(toml::ser::Error),
    #[error("{message}")]
    InvalidSchema { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub auto_delete: AutoDeleteSetting,
    #[serde(default)]
    pub onboarding: OnboardingState,
    #[serde(default)]
    pub auto_delete_count: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_delete: AutoDeleteSetting::Off,
            onboarding: OnboardingState::Init,
            auto_delete_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SettingsFile {
    version: i64,
    #[serde(default)]
    settings: Settings,
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            settings: Settings::default(),
        }
    }
}

pub fn settings_path(dir: &Path) -> PathBuf {
    dir.join("settings.toml")
}

/// `settings.toml` backed store; each call reads and writes the whole file.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(settings_path(dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Settings, SettingsError> {
        Ok(load_settings_file(&self.path)?.settings)
    }

    fn update<T>(&self, apply: impl FnOnce(&mut Settings) -> T) -> Result<T, SettingsError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = load_settings_file(&self.path)?;
        let value = apply(&mut file.settings);
        write_settings_file(&self.path, &file)?;
        Ok(value)
    }
}

impl SettingsStore for FileSettingsStore {
    fn auto_delete_setting(&self) -> anyhow::Result<AutoDeleteSetting> {
        Ok(self.load()?.auto_delete)
    }

    fn set_auto_delete_setting(&self, setting: AutoDeleteSetting) -> anyhow::Result<()> {
        self.update(|settings| settings.auto_delete = setting)?;
        Ok(())
    }

    fn onboarding_state(&self) -> anyhow::Result<OnboardingState> {
        Ok(self.load()?.onboarding)
    }

    fn set_onboarding_state(&self, state: OnboardingState) -> anyhow::Result<()> {
        self.update(|settings| settings.onboarding = state)?;
        Ok(())
    }

    fn auto_delete_count(&self) -> anyhow::Result<u64> {
        Ok(self.load()?.auto_delete_count)
    }

    fn increment_auto_delete_count(&self, by: u64) -> anyhow::Result<u64> {
        Ok(self.update(|settings| {
            settings.auto_delete_count = settings.auto_delete_count.saturating_add(by);
            settings.auto_delete_count
        })?)
    }

    fn reset_auto_delete_count(&self) -> anyhow::Result<u64> {
        Ok(self.update(|settings| std::mem::take(&mut settings.auto_delete_count))?)
    }
}

fn load_settings_file(path: &Path) -> Result<SettingsFile, SettingsError> {
    if !path.exists() {
        return Ok(SettingsFile::default());
    }

    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let parsed_value: toml::Value =
        toml::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    match parsed_value
        .as_table()
        .and_then(|root| root.get("version"))
        .map(toml::Value::as_integer)
    {
        Some(Some(SETTINGS_VERSION)) => {}
        Some(Some(found)) => {
            return Err(SettingsError::InvalidSchema {
                message: format!(
                    "invalid settings schema: unsupported version (expected {SETTINGS_VERSION}, found {found})"
                ),
            });
        }
        Some(None) => {
            return Err(SettingsError::InvalidSchema {
                message: "invalid settings schema: unsupported version (expected integer)"
                    .to_string(),
            });
        }
        None => {
            return Err(SettingsError::InvalidSchema {
                message: "invalid settings schema: missing required top-level field 'version'"
                    .to_string(),
            });
        }
    }

    parsed_value
        .try_into()
        .map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

fn write_settings_file(path: &Path, file: &SettingsFile) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let serialized = toml::to_string(file).map_err(SettingsError::Serialize)?;
    let temp_path = path.with_extension("toml.tmp");

    fs::write(&temp_path, serialized).map_err(|source| SettingsError::Write {
        path: temp_path.clone(),
        source,
    })?;

    fs::rename(&temp_path, path).map_err(|source| SettingsError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(())
}
