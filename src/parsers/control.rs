//! Compiled control-system packages and their interface projects.

use tracing::{info, warn};

use crate::{
    bus::{ChangeEvent, NotificationRequest},
    package,
    parsers::{
        ChangeParser, request_for, timestamp,
        extensions::{COMPILED_PACKAGE, INTERFACE_PROJECT},
    },
};

/// Reports the device table of a compiled package, and a version change
/// for its interface project.
pub struct CompiledPackageParser {
    icon_url: String,
}

impl CompiledPackageParser {
    pub fn new(icon_url: impl Into<String>) -> Self {
        Self {
            icon_url: icon_url.into(),
        }
    }
}

impl ChangeParser for CompiledPackageParser {
    fn name(&self) -> &'static str {
        "package"
    }

    fn owns(&self, extension: &str) -> bool {
        extension == COMPILED_PACKAGE || extension == INTERFACE_PROJECT
    }

    fn handle(&self, event: &ChangeEvent) -> Option<NotificationRequest> {
        if let Some(action) = &event.custom_action {
            warn!(
                "Package {:?} changed with custom action {:?}, skipping default report",
                event.path, action
            );
            return None;
        }

        let body = if event.extension == COMPILED_PACKAGE {
            info!("Decoding device table from {:?}", event.path);
            package::parse(&event.path)
        } else {
            format!(
                "{} Updated\n\n\tAssuming New Version/Import Change Was Made @ {}",
                event.extension.to_uppercase(),
                timestamp()
            )
        };

        Some(request_for(event, body, &self.icon_url))
    }
}
