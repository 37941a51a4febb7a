//! Watched folder configuration with XDG Base Directory compliance.
//!
//! This module loads the list of watched folders and pipeline tunables
//! from a JSON file in the user's config directory.

use std::{
    env::var,
    fs::{create_dir_all, read_to_string, write},
    io::Error as StdError,
    path::{Path, PathBuf},
};

use {
    parking_lot::{RwLock, RwLockReadGuard},
    serde::{Deserialize, Serialize},
    serde_json::{Error as SerdeJsonError, from_str, to_string_pretty},
    thiserror::Error,
    tracing::{debug, info},
};

/// Default quiet period before a changed file is considered settled.
pub const DEFAULT_DEBOUNCE_INTERVAL_MS: u64 = 1000;

/// Icon for generic file notifications.
const DEFAULT_ICON_URL: &str = "https://ccsnewengland.com/wp-content/uploads/2020/09/CCS-Logo.png";

/// Icon for control-system package notifications.
const CONTROL_ICON_URL: &str = concat!(
    "https://kenticoprod.azureedge.net/kenticoblob/crestron/media/crestron/",
    "generalsiteimages/crestron-logo.png"
);

/// Error type for settings operations.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Failed to read or write settings file.
    #[error("IO error: {0}")]
    IoError(#[from] StdError),
    /// Failed to serialize or deserialize settings.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] SerdeJsonError),
    /// Invalid settings value.
    #[error("Invalid settings value: {reason}")]
    InvalidValue { reason: String },
}

/// A file extension a folder cares about, optionally tagged with a
/// custom notification action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRule {
    /// Lowercase, dot-prefixed extension (e.g. `.lpz`).
    pub extension: String,
    /// Alternate notification template for this extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_action: Option<String>,
}

impl ExtensionRule {
    /// Creates a normalized rule.
    ///
    /// # Arguments
    ///
    /// * `extension` - Extension with or without the leading dot, any case.
    /// * `custom_action` - Optional custom action tag; empty strings are dropped.
    pub fn new(extension: impl AsRef<str>, custom_action: Option<String>) -> Self {
        Self {
            extension: normalize_extension(extension.as_ref()),
            custom_action: custom_action.filter(|action| !action.trim().is_empty()),
        }
    }

    /// Returns a copy with the extension and custom action normalized.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self::new(self.extension, self.custom_action)
    }
}

/// A directory tree to watch and where its notifications go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedFolder {
    /// Root of the watched tree.
    pub path: PathBuf,
    /// Delivery target (webhook or channel link) for files under `path`.
    #[serde(rename = "webhook", default)]
    pub target: String,
    /// Extension allow-list. Empty means every file is of interest.
    #[serde(default)]
    pub extensions: Vec<ExtensionRule>,
}

impl WatchedFolder {
    /// Creates a folder with normalized extension rules.
    pub fn new(
        path: impl Into<PathBuf>,
        target: impl Into<String>,
        extensions: Vec<ExtensionRule>,
    ) -> Self {
        Self {
            path: path.into(),
            target: target.into(),
            extensions: extensions.into_iter().map(ExtensionRule::normalized).collect(),
        }
    }

    /// Finds the rule for an already-normalized extension.
    ///
    /// # Returns
    ///
    /// The first rule whose extension equals `extension`, if any.
    pub fn rule_for(&self, extension: &str) -> Option<&ExtensionRule> {
        self.extensions
            .iter()
            .find(|rule| rule.extension == extension)
    }

    /// Checks whether `path` lies inside this folder's tree.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.path)
    }
}

/// Serializable notifier settings with default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierSettings {
    /// Folders to watch.
    pub folders: Vec<WatchedFolder>,
    /// Quiet period in milliseconds before a change settles.
    pub debounce_interval_ms: u64,
    /// Icon attached to generic file notifications.
    pub default_icon_url: String,
    /// Icon attached to control-system package notifications.
    pub control_icon_url: String,
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            folders: vec![],
            debounce_interval_ms: DEFAULT_DEBOUNCE_INTERVAL_MS,
            default_icon_url: DEFAULT_ICON_URL.to_string(),
            control_icon_url: CONTROL_ICON_URL.to_string(),
        }
    }
}

impl NotifierSettings {
    /// Normalizes extension rules and validates tunables.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidValue` for a zero debounce interval.
    pub fn normalized(mut self) -> Result<Self, SettingsError> {
        if self.debounce_interval_ms == 0 {
            return Err(SettingsError::InvalidValue {
                reason: "debounce_interval_ms must be greater than zero".to_string(),
            });
        }

        for folder in &mut self.folders {
            folder.extensions = std::mem::take(&mut folder.extensions)
                .into_iter()
                .map(ExtensionRule::normalized)
                .collect();
        }

        Ok(self)
    }
}

/// Handles loading and reloading of the notifier settings.
#[derive(Debug)]
pub struct SettingsManager {
    /// Thread-safe settings storage.
    settings: RwLock<NotifierSettings>,
    /// Path to the configuration file on disk.
    config_path: PathBuf,
}

impl SettingsManager {
    /// Creates a new settings manager with the default config path.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if settings cannot be loaded from disk.
    pub fn new() -> Result<Self, SettingsError> {
        Self::with_config_path(get_config_path())
    }

    /// Creates a new settings manager with a custom config path.
    ///
    /// A missing file is created with default contents.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Custom path for the settings file
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if settings cannot be read, parsed or written.
    pub fn with_config_path(config_path: PathBuf) -> Result<Self, SettingsError> {
        if let Some(parent) = config_path.parent() {
            create_dir_all(parent)?;
        }

        let settings = if config_path.exists() {
            debug!("Loading settings from existing file: {:?}", config_path);
            load_from(&config_path)?
        } else {
            info!("Creating new default settings file: {:?}", config_path);
            let defaults = NotifierSettings::default();
            write(&config_path, to_string_pretty(&defaults)?)?;
            defaults
        };

        Ok(SettingsManager {
            settings: RwLock::new(settings),
            config_path,
        })
    }

    /// Gets the current settings.
    pub fn get_settings(&self) -> RwLockReadGuard<'_, NotifierSettings> {
        self.settings.read()
    }

    /// Gets the configuration file path.
    pub fn get_config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Re-reads the settings file, replacing the in-memory copy.
    ///
    /// On failure the previous settings are kept.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the file cannot be read or parsed.
    pub fn reload(&self) -> Result<NotifierSettings, SettingsError> {
        let fresh = load_from(&self.config_path)?;
        *self.settings.write() = fresh.clone();
        info!(folders = fresh.folders.len(), "Settings reloaded");
        Ok(fresh)
    }
}

fn load_from(path: &Path) -> Result<NotifierSettings, SettingsError> {
    let contents = read_to_string(path)?;
    from_str::<NotifierSettings>(&contents)?.normalized()
}

/// Lowercases an extension and ensures it carries a leading dot.
pub fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim().to_lowercase();
    if trimmed.starts_with('.') {
        trimmed
    } else {
        format!(".{trimmed}")
    }
}

/// Ensures proper XDG directory usage for the config file.
///
/// # Returns
///
/// The path to the configuration file.
#[must_use]
pub fn get_config_path() -> PathBuf {
    let mut config_dir = get_xdg_config_home();
    config_dir.push("revwatch");
    config_dir.push("config.json");
    config_dir
}

/// Gets the XDG config home directory following XDG Base Directory specification.
///
/// Uses `XDG_CONFIG_HOME` environment variable if set, otherwise defaults to $HOME/.config
fn get_xdg_config_home() -> PathBuf {
    if let Ok(config_home) = var("XDG_CONFIG_HOME")
        && !config_home.is_empty()
    {
        return PathBuf::from(config_home);
    }

    if let Ok(home) = var("HOME") {
        let mut path = PathBuf::from(home);
        path.push(".config");
        return path;
    }

    PathBuf::from(".")
}
