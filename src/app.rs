//! Top-level wiring of the notifier pipeline.
//!
//! This module implements the `Notifier` which owns the bus, the parser
//! subscriptions, the notification assembler and the watch coordinator, and
//! applies reloaded settings to them.

use std::sync::Arc;

use {
    tokio::runtime::Handle,
    tracing::{error, info, warn},
};

use crate::{
    bus::{EventBus, MonitorStatus, StatusLevel},
    config::SettingsManager,
    error::{ErrorReporter, ResultExt},
    monitor::{DebounceEngine, MonitorConfig, WatchCoordinator, WatchSummary},
    notifications::{Delivery, NotificationAssembler},
    parsers::ParserRegistry,
};

/// The assembled notifier.
pub struct Notifier {
    /// Settings source, re-read on reload.
    settings: SettingsManager,
    /// Bus shared by every component.
    bus: Arc<EventBus>,
    /// Delivery boundary; its folder list follows reloads.
    assembler: Arc<NotificationAssembler>,
    /// Folder watches.
    coordinator: WatchCoordinator,
}

impl Notifier {
    /// Wires the pipeline from the current settings without starting it.
    ///
    /// # Arguments
    ///
    /// * `settings` - Loaded settings manager.
    /// * `delivery` - Transport for outbound notifications.
    /// * `runtime` - Runtime the debounce timers run on.
    pub fn new(settings: SettingsManager, delivery: Arc<dyn Delivery>, runtime: Handle) -> Self {
        let current = settings.get_settings().clone();
        let bus = Arc::new(EventBus::new());

        bus.subscribe(|status: &MonitorStatus| {
            match status.level {
                StatusLevel::Info => info!("{}: {}", status.title, status.text),
                StatusLevel::Warning => warn!("{}: {}", status.title, status.text),
                StatusLevel::Error => error!("{}: {}", status.title, status.text),
            }
            Ok(())
        });

        let registry = ParserRegistry::with_defaults(&current);
        registry.attach(&bus);
        info!("Attached parsers: {}", registry.names().join(", "));

        let assembler = Arc::new(NotificationAssembler::new(delivery, current.folders.clone()));
        assembler.attach(&bus);

        let engine = DebounceEngine::new(Arc::clone(&bus), MonitorConfig::from(&current), runtime);
        let coordinator = WatchCoordinator::new(Arc::clone(&bus), engine);

        Self {
            settings,
            bus,
            assembler,
            coordinator,
        }
    }

    /// Starts watching the configured folders.
    pub fn start(&self) -> WatchSummary {
        let folders = self.settings.get_settings().folders.clone();
        self.coordinator.start(&folders)
    }

    /// Re-reads the settings file and re-arms the watches.
    ///
    /// Folder list and delivery targets follow the file. The debounce
    /// interval and icons keep their startup values. On failure the current
    /// watches stay in place and an error status is published.
    ///
    /// # Returns
    ///
    /// The new watch summary, or `None` if the file could not be reloaded.
    pub fn reload(&self) -> Option<WatchSummary> {
        let reloaded = self.settings.reload().add_contextf(format_args!(
            "Failed to reload {}",
            self.settings.get_config_path().display()
        ));

        match reloaded {
            Ok(fresh) => {
                self.assembler.set_folders(fresh.folders.clone());
                Some(self.coordinator.start(&fresh.folders))
            }
            Err(e) => {
                ErrorReporter::warn(&e, "reloading settings");
                self.bus.publish(MonitorStatus::new(
                    "Reload Failed",
                    ErrorReporter::to_user_message(&e),
                    StatusLevel::Error,
                ));
                None
            }
        }
    }

    /// Stops all watches.
    pub fn stop(&self) {
        self.coordinator.stop();
    }

    /// Bus shared by the pipeline.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Watch coordinator.
    pub fn coordinator(&self) -> &WatchCoordinator {
        &self.coordinator
    }
}

#[cfg(test)]
mod tests {
    use std::{fs::write, path::Path, sync::Arc};

    use {parking_lot::Mutex, tempfile::TempDir, tokio::runtime::Handle};

    use crate::{
        app::Notifier,
        bus::{MonitorStatus, StatusLevel},
        config::SettingsManager,
        notifications::LogDelivery,
    };

    fn config_with_folders(config_path: &Path, folders: &[&Path]) {
        let folders: Vec<String> = folders
            .iter()
            .map(|folder| {
                format!(
                    r#"{{ "path": {:?}, "webhook": "https://hooks/x", "extensions": [] }}"#,
                    folder.display().to_string()
                )
            })
            .collect();
        write(config_path, format!(r#"{{ "folders": [{}] }}"#, folders.join(", "))).unwrap();
    }

    #[tokio::test]
    async fn test_reload_rearms_watches() {
        let temp_dir = TempDir::new().unwrap();
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        config_with_folders(&config_path, &[first.path()]);

        let notifier = Notifier::new(
            SettingsManager::with_config_path(config_path.clone()).unwrap(),
            Arc::new(LogDelivery),
            Handle::current(),
        );
        assert_eq!(notifier.start().watched, vec![first.path().to_path_buf()]);

        config_with_folders(&config_path, &[first.path(), second.path()]);
        let summary = notifier.reload().unwrap();

        assert_eq!(summary.watched.len(), 2);
        assert_eq!(notifier.coordinator().watched_folders().len(), 2);

        notifier.stop();
        assert!(notifier.coordinator().watched_folders().is_empty());
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_watches_and_reports() {
        let temp_dir = TempDir::new().unwrap();
        let watched = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        config_with_folders(&config_path, &[watched.path()]);

        let notifier = Notifier::new(
            SettingsManager::with_config_path(config_path.clone()).unwrap(),
            Arc::new(LogDelivery),
            Handle::current(),
        );
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&statuses);
        notifier.bus().subscribe(move |status: &MonitorStatus| {
            sink.lock().push(status.clone());
            Ok(())
        });
        notifier.start();

        write(&config_path, "{ broken").unwrap();
        assert!(notifier.reload().is_none());
        assert_eq!(notifier.coordinator().watched_folders().len(), 1);

        let statuses = statuses.lock();
        let failure = statuses.last().unwrap();
        assert_eq!(failure.title, "Reload Failed");
        assert_eq!(failure.level, StatusLevel::Error);
        assert!(failure.text.starts_with("Failed to reload "));
        assert!(failure.text.contains("Serialization error"));
    }
}
