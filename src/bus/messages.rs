//! Messages exchanged over the event bus.

use std::path::{Path, PathBuf};

/// A watched file whose content settled on a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Absolute path of the changed file.
    pub path: PathBuf,
    /// Lowercase, dot-prefixed extension the file was matched under.
    pub extension: String,
    /// Custom action tag from the matching extension rule.
    pub custom_action: Option<String>,
}

impl ChangeEvent {
    /// File name component, lossily converted.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Directory containing the file.
    pub fn folder_path(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// A formatted notification ready for the delivery boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    /// Name of the changed file.
    pub file_name: String,
    /// Directory containing the changed file.
    pub folder_path: PathBuf,
    /// Human title, e.g. `.TXT File Updated`.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// Icon reference for the rich card.
    pub icon_url: String,
    /// Custom action tag, passed through untouched.
    pub custom_action: Option<String>,
}

/// Severity shown on the status surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// Short status notice for the tray/status surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorStatus {
    pub title: String,
    pub text: String,
    pub level: StatusLevel,
}

impl MonitorStatus {
    /// Creates a status notice.
    pub fn new(title: impl Into<String>, text: impl Into<String>, level: StatusLevel) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            level,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use crate::bus::messages::ChangeEvent;

    #[test]
    fn test_change_event_path_parts() {
        let event = ChangeEvent {
            path: PathBuf::from("/srv/programs/room/main.lpz"),
            extension: ".lpz".to_string(),
            custom_action: None,
        };
        assert_eq!(event.file_name(), "main.lpz");
        assert_eq!(event.folder_path(), Path::new("/srv/programs/room"));
    }
}
