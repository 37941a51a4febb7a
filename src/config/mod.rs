//! Watched folder configuration and pipeline tunables.
//!
//! This module provides the JSON settings file handling with XDG Base
//! Directory compliance.

pub mod settings;

pub use settings::{
    ExtensionRule, NotifierSettings, SettingsError, SettingsManager, WatchedFolder,
    get_config_path, normalize_extension,
};
