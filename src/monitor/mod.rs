//! File system change detection using the `notify` crate.
//!
//! This module owns one recursive watcher per configured folder, filters
//! raw events by the folder's extension rules and feeds the survivors into
//! the debounce engine.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    notify::{Config, Event, RecommendedWatcher, RecursiveMode::Recursive, Watcher},
    parking_lot::Mutex,
    tracing::{debug, info, warn},
};

use crate::{
    bus::{EventBus, MonitorStatus, StatusLevel},
    config::WatchedFolder,
    error::domain::WatchError,
};

mod config;
mod debouncer;
mod events;
mod fingerprint;

#[cfg(test)]
mod pipeline_tests;

pub use {
    config::MonitorConfig,
    debouncer::DebounceEngine,
    events::{EventRoute, RawEventKind, dispatch_raw_event, extension_of, route_event},
    fingerprint::{FingerprintStore, digests_equal, hash_file},
};

/// One active recursive watch.
struct FolderWatch {
    /// Root of the watched tree.
    path: PathBuf,
    /// Internal notify watcher; dropping it ends the watch.
    watcher: RecommendedWatcher,
}

/// Result of [`WatchCoordinator::start`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSummary {
    /// Folders now being watched.
    pub watched: Vec<PathBuf>,
    /// Folders that were skipped, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Starts and stops the watches for all configured folders as a unit.
pub struct WatchCoordinator {
    /// Bus used for status notices.
    bus: Arc<EventBus>,
    /// Receives every forwarded raw event.
    engine: DebounceEngine,
    /// Active watches; the lock also serializes start/stop.
    watches: Mutex<Vec<FolderWatch>>,
}

impl WatchCoordinator {
    /// Creates a coordinator with no active watches.
    pub fn new(bus: Arc<EventBus>, engine: DebounceEngine) -> Self {
        Self {
            bus,
            engine,
            watches: Mutex::new(Vec::new()),
        }
    }

    /// Replaces all active watches with watches for `folders`.
    ///
    /// Existing watches are fully torn down before any new one is
    /// registered. Folders that are missing or cannot be watched are
    /// skipped; the others proceed.
    ///
    /// # Returns
    ///
    /// Which folders are watched and which were skipped.
    pub fn start(&self, folders: &[WatchedFolder]) -> WatchSummary {
        let mut summary = WatchSummary::default();
        let stopped = {
            let mut watches = self.watches.lock();
            let stopped = self.stop_locked(&mut watches);
            self.engine.resume();

            for folder in folders {
                match self.watch_folder(folder) {
                    Ok(watch) => {
                        info!(
                            "Started watching folder: {:?}, {} extensions: {}",
                            folder.path,
                            folder.extensions.len(),
                            folder
                                .extensions
                                .iter()
                                .map(|rule| rule.extension.as_str())
                                .collect::<Vec<_>>()
                                .join(", ")
                        );
                        summary.watched.push(watch.path.clone());
                        watches.push(watch);
                    }
                    Err(e) => {
                        warn!("Skipping folder: {}", e);
                        summary.skipped.push((folder.path.clone(), e.to_string()));
                    }
                }
            }

            stopped
        };

        if let Some(status) = stopped {
            self.bus.publish(status);
        }

        let status = if summary.watched.is_empty() {
            info!("Failed to start monitoring, no folders available");
            MonitorStatus::new(
                "Monitoring Failed",
                "No Folders Configured",
                StatusLevel::Error,
            )
        } else {
            info!("Started monitoring {} folders", summary.watched.len());
            MonitorStatus::new(
                "Monitoring Started",
                format!("Monitoring {} Folders", summary.watched.len()),
                StatusLevel::Info,
            )
        };
        self.bus.publish(status);

        summary
    }

    /// Disposes every active watch, suspends the debounce engine and
    /// cancels its pending timers.
    ///
    /// Safe to call when nothing is being watched.
    pub fn stop(&self) {
        let stopped = self.stop_locked(&mut self.watches.lock());
        if let Some(status) = stopped {
            self.bus.publish(status);
        }
    }

    /// Paths currently being watched.
    pub fn watched_folders(&self) -> Vec<PathBuf> {
        self.watches
            .lock()
            .iter()
            .map(|watch| watch.path.clone())
            .collect()
    }

    /// The engine raw events are routed into.
    pub fn engine(&self) -> &DebounceEngine {
        &self.engine
    }

    fn stop_locked(&self, watches: &mut Vec<FolderWatch>) -> Option<MonitorStatus> {
        if watches.is_empty() {
            debug!("No watchers to unsubscribe from");
            return None;
        }

        self.engine.suspend();
        let count = watches.len();
        let mut failures = Vec::new();
        for mut watch in watches.drain(..) {
            match watch.watcher.unwatch(&watch.path) {
                Ok(()) => info!("Unsubscribed from {:?}", watch.path),
                Err(e) => {
                    warn!("Failed to unsubscribe from {:?}: {}", watch.path, e);
                    failures.push(e.to_string());
                }
            }
        }
        // Catches touches that passed the accepting check before suspend.
        self.engine.cancel_all();

        Some(if failures.is_empty() {
            MonitorStatus::new(
                "Stopped Monitoring",
                format!("{count} Folders"),
                StatusLevel::Info,
            )
        } else {
            MonitorStatus::new(
                "Failed To Stop Monitoring",
                failures.join("; "),
                StatusLevel::Error,
            )
        })
    }

    fn watch_folder(&self, folder: &WatchedFolder) -> Result<FolderWatch, WatchError> {
        if !folder.path.exists() {
            return Err(WatchError::MissingFolder {
                path: folder.path.clone(),
            });
        }

        let routed = folder.clone();
        let engine = self.engine.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| dispatch_raw_event(res, &routed, &engine),
            Config::default(),
        )
        .map_err(|source| watcher_error(&folder.path, source))?;

        watcher
            .watch(&folder.path, Recursive)
            .map_err(|source| watcher_error(&folder.path, source))?;

        Ok(FolderWatch {
            path: folder.path.clone(),
            watcher,
        })
    }
}

fn watcher_error(path: &Path, source: notify::Error) -> WatchError {
    WatchError::Watcher {
        path: path.to_path_buf(),
        source,
    }
}
