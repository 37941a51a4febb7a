//! Plain documents and opaque third-party design files.

use std::{fs::read, path::Path};

use tracing::{info, warn};

use crate::{
    bus::{ChangeEvent, NotificationRequest},
    parsers::{
        ChangeParser, request_for, revision_body, timestamp,
        extensions::{Readability, document_readability},
    },
};

/// Shows readable documents verbatim and reports opaque ones as revised.
pub struct DocumentParser {
    icon_url: String,
}

impl DocumentParser {
    pub fn new(icon_url: impl Into<String>) -> Self {
        Self {
            icon_url: icon_url.into(),
        }
    }
}

impl ChangeParser for DocumentParser {
    fn name(&self) -> &'static str {
        "document"
    }

    fn owns(&self, extension: &str) -> bool {
        document_readability(extension).is_some()
    }

    fn handle(&self, event: &ChangeEvent) -> Option<NotificationRequest> {
        if event.custom_action.is_some() {
            return None;
        }

        let body = match document_readability(&event.extension)? {
            Readability::Readable => readable_content(&event.path),
            Readability::Opaque => revision_body(),
        };
        Some(request_for(event, body, &self.icon_url))
    }
}

/// Reads the whole file as one byte per character.
///
/// An unreadable or empty file yields a fallback line with the time of the
/// attempt.
pub fn readable_content(path: &Path) -> String {
    match read(path) {
        Ok(bytes) if !bytes.is_empty() => {
            info!("Read {} bytes from {:?}", bytes.len(), path);
            bytes.iter().map(|&byte| char::from(byte)).collect()
        }
        Ok(_) => unreadable_body(),
        Err(e) => {
            warn!("Failed to read {:?}: {}", path, e);
            unreadable_body()
        }
    }
}

fn unreadable_body() -> String {
    format!("Unable To Read File Contents @ {}", timestamp())
}
