//! Domain-specific error types using `thiserror`.
//!
//! This module defines the error enums for the different domains of the
//! notifier: directory watching, package decoding, and delivery.

use std::{io::Error as IoError, path::PathBuf};

use {notify::Error as NotifyError, thiserror::Error, zip::result::ZipError};

/// Directory watch errors.
#[derive(Error, Debug)]
pub enum WatchError {
    /// The configured folder does not exist on disk.
    #[error("Watched folder does not exist: {}", path.display())]
    MissingFolder { path: PathBuf },
    /// The OS-level watcher could not be created or registered.
    #[error("Failed to watch {}: {source}", path.display())]
    Watcher {
        path: PathBuf,
        #[source]
        source: NotifyError,
    },
}

/// Compiled package decoding errors.
///
/// These never escape [`crate::package::parse`]; they only decide which
/// degraded result is rendered.
#[derive(Error, Debug)]
pub enum PackageError {
    /// Failed to open or read the package file.
    #[error("Package IO error: {0}")]
    Io(#[from] IoError),
    /// The package is not a readable zip container.
    #[error("Package archive error: {0}")]
    Archive(#[from] ZipError),
    /// A companion member is absent from the package.
    #[error("Package member not found: {name}")]
    MissingMember { name: String },
}

/// Outbound delivery errors.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// No watched folder contains the changed file.
    #[error("No delivery target configured for {folder}")]
    NoTarget { folder: String },
    /// The payload could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The transport rejected the notification.
    #[error("Transport error: {reason}")]
    Transport { reason: String },
}
