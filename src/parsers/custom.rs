//! Tagged changes rendered through their rule's template.

use crate::{
    bus::{ChangeEvent, NotificationRequest},
    parsers::{ChangeParser, request_for, timestamp},
};

/// Handles every event whose extension rule carries a custom action.
///
/// The action text is a template; `{file}`, `{folder}`, `{extension}` and
/// `{timestamp}` are replaced with values from the event.
pub struct CustomActionParser {
    icon_url: String,
}

impl CustomActionParser {
    pub fn new(icon_url: impl Into<String>) -> Self {
        Self {
            icon_url: icon_url.into(),
        }
    }
}

impl ChangeParser for CustomActionParser {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn owns(&self, _extension: &str) -> bool {
        true
    }

    fn handle(&self, event: &ChangeEvent) -> Option<NotificationRequest> {
        let template = event.custom_action.as_deref()?;
        Some(request_for(event, render_template(template, event), &self.icon_url))
    }
}

/// Fills the placeholders of `template` from `event`.
pub fn render_template(template: &str, event: &ChangeEvent) -> String {
    template
        .replace("{file}", &event.file_name())
        .replace("{folder}", &event.folder_path().display().to_string())
        .replace("{extension}", &event.extension)
        .replace("{timestamp}", &timestamp())
}
