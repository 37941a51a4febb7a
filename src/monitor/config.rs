//! Configuration for watcher and debounce behavior.

use std::time::Duration;

use crate::config::{NotifierSettings, settings::DEFAULT_DEBOUNCE_INTERVAL_MS};

/// Configuration for watcher and debounce behavior.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Quiet period after the last raw event before a file settles.
    pub debounce_interval_ms: u64,
}

impl MonitorConfig {
    /// Debounce interval as a `Duration`.
    pub fn debounce_interval(&self) -> Duration {
        Duration::from_millis(self.debounce_interval_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            debounce_interval_ms: DEFAULT_DEBOUNCE_INTERVAL_MS,
        }
    }
}

impl From<&NotifierSettings> for MonitorConfig {
    fn from(settings: &NotifierSettings) -> Self {
        Self {
            debounce_interval_ms: settings.debounce_interval_ms,
        }
    }
}
