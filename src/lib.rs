//! Revwatch - Directory Revision Notifier
//!
//! Watches configured directory trees, waits for changed files to settle,
//! drops changes whose content hash did not move, and turns the rest into
//! notifications. Compiled control-system packages are decoded into a
//! per-device table; other files are shown verbatim or reported as revised.

pub mod app;
pub mod bus;
pub mod config;
pub mod error;
pub mod monitor;
pub mod notifications;
pub mod package;
pub mod parsers;

// Re-export key types for convenience
pub use {
    app::Notifier,
    bus::{ChangeEvent, EventBus, MonitorStatus, NotificationRequest, StatusLevel},
    config::{NotifierSettings, SettingsManager, WatchedFolder},
    error::{DeliveryError, PackageError, WatchError},
    monitor::{DebounceEngine, MonitorConfig, WatchCoordinator},
    notifications::{Delivery, LogDelivery, NotificationAssembler},
    package::PackageReport,
    parsers::{ChangeParser, ParserRegistry},
};
