//! Delivery boundary for formatted notifications.
//!
//! The `NotificationAssembler` consumes [`NotificationRequest`]s from the
//! bus, suppresses repeats of the same body for the same file, resolves the
//! delivery target from the watched folder and hands the payload to a
//! [`Delivery`] implementation.

use std::{
    path::Path,
    sync::{Arc, Weak},
};

use {
    anyhow::Error,
    chrono::Local,
    dashmap::DashMap,
    parking_lot::RwLock,
    serde::Serialize,
    tracing::{debug, info},
};

use crate::{
    bus::{EventBus, MonitorStatus, NotificationRequest, StatusLevel, SubscriptionId},
    config::WatchedFolder,
    error::{DeliveryError, ErrorReporter},
};

/// Payload handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundNotification {
    pub title: String,
    pub file_name: String,
    pub folder_path: String,
    pub body: String,
    pub icon_url: String,
    /// Selects alternate formatting in the transport when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_action: Option<String>,
    /// RFC 3339 local time the payload was assembled.
    pub assembled_at: String,
}

impl OutboundNotification {
    /// Builds the payload for `request`.
    pub fn from_request(request: &NotificationRequest) -> Self {
        Self {
            title: request.title.clone(),
            file_name: request.file_name.clone(),
            folder_path: request.folder_path.display().to_string(),
            body: request.body.clone(),
            icon_url: request.icon_url.clone(),
            custom_action: request.custom_action.clone(),
            assembled_at: Local::now().to_rfc3339(),
        }
    }
}

/// Transport for outbound notifications.
pub trait Delivery: Send + Sync {
    /// Sends `notification` to `target`.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError` if the payload cannot be encoded or the
    /// transport rejects it.
    fn deliver(&self, target: &str, notification: &OutboundNotification)
    -> Result<(), DeliveryError>;
}

/// Delivery that writes the JSON payload to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDelivery;

impl Delivery for LogDelivery {
    fn deliver(
        &self,
        target: &str,
        notification: &OutboundNotification,
    ) -> Result<(), DeliveryError> {
        let payload = serde_json::to_string_pretty(notification)?;
        info!(target_url = target, "Notification for {}:\n{}", notification.file_name, payload);
        Ok(())
    }
}

/// What happened to one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyOutcome {
    /// Handed to the delivery.
    Delivered,
    /// Same body as the last request for this file.
    Unchanged,
}

/// Deduplicates requests and forwards the rest to a [`Delivery`].
pub struct NotificationAssembler {
    delivery: Arc<dyn Delivery>,
    /// Folders used to resolve delivery targets.
    folders: RwLock<Vec<WatchedFolder>>,
    /// Last body seen per file name.
    last_bodies: DashMap<String, String>,
}

impl NotificationAssembler {
    /// Creates an assembler resolving targets against `folders`.
    pub fn new(delivery: Arc<dyn Delivery>, folders: Vec<WatchedFolder>) -> Self {
        Self {
            delivery,
            folders: RwLock::new(folders),
            last_bodies: DashMap::new(),
        }
    }

    /// Replaces the folders used for target resolution.
    pub fn set_folders(&self, folders: Vec<WatchedFolder>) {
        *self.folders.write() = folders;
    }

    /// Delivery target of the innermost watched folder containing `path`.
    pub fn target_for(&self, path: &Path) -> Option<String> {
        self.folders
            .read()
            .iter()
            .filter(|folder| folder.contains(path))
            .max_by_key(|folder| folder.path.components().count())
            .map(|folder| folder.target.clone())
            .filter(|target| !target.is_empty())
    }

    /// Processes one request.
    ///
    /// The body is remembered even when delivery fails, so a retry needs
    /// new content.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError` if no target is configured for the file or
    /// the delivery fails.
    pub fn assemble(
        &self,
        request: &NotificationRequest,
    ) -> Result<AssemblyOutcome, DeliveryError> {
        let previous = self
            .last_bodies
            .insert(request.file_name.clone(), request.body.clone());

        match previous {
            Some(previous) if previous == request.body => {
                debug!("Content for {} has not changed, skipping", request.file_name);
                return Ok(AssemblyOutcome::Unchanged);
            }
            Some(_) => info!("Content for {} has changed, sending update", request.file_name),
            None => info!("First update for {} since start", request.file_name),
        }

        let target = self
            .target_for(&request.folder_path)
            .ok_or_else(|| DeliveryError::NoTarget {
                folder: request.folder_path.display().to_string(),
            })?;

        self.delivery
            .deliver(&target, &OutboundNotification::from_request(request))?;
        Ok(AssemblyOutcome::Delivered)
    }

    /// Subscribes the assembler to `NotificationRequest` on `bus`.
    ///
    /// Delivery failures are reported and published as an error
    /// [`MonitorStatus`].
    pub fn attach(self: &Arc<Self>, bus: &Arc<EventBus>) -> SubscriptionId {
        let assembler = Arc::clone(self);
        let bus_ref: Weak<EventBus> = Arc::downgrade(bus);

        bus.subscribe(move |request: &NotificationRequest| {
            let status = match assembler.assemble(request) {
                Ok(AssemblyOutcome::Delivered) => {
                    MonitorStatus::new("Update Success", &request.file_name, StatusLevel::Info)
                }
                Ok(AssemblyOutcome::Unchanged) => return Ok(()),
                Err(e) => {
                    let text = e.to_string();
                    ErrorReporter::warn(
                        &Error::new(e),
                        &format!("delivering {}", request.file_name),
                    );
                    MonitorStatus::new("Update Failed", text, StatusLevel::Error)
                }
            };

            if let Some(bus) = bus_ref.upgrade() {
                bus.publish(status);
            }
            Ok(())
        })
    }
}
