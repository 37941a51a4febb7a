//! Parser dispatch for settled changes.
//!
//! Every parser is subscribed to [`ChangeEvent`] separately and decides from
//! the extension whether the event is its own. A parser that produces a
//! [`NotificationRequest`] has it published back onto the bus.

use std::sync::{Arc, Weak};

use {
    anyhow::Result,
    chrono::Local,
    tracing::{debug, trace},
};

use crate::{
    bus::{ChangeEvent, EventBus, NotificationRequest, SubscriptionId},
    config::NotifierSettings,
};

pub mod control;
pub mod custom;
pub mod document;
pub mod extensions;

pub use {
    control::CompiledPackageParser, custom::CustomActionParser, document::DocumentParser,
    extensions::Readability,
};

/// Turns a settled change into a notification.
pub trait ChangeParser: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this parser handles files with `extension`.
    fn owns(&self, extension: &str) -> bool;

    /// Builds a notification for an owned event, or `None` to stay silent.
    fn handle(&self, event: &ChangeEvent) -> Option<NotificationRequest>;
}

/// Ordered set of parsers sharing one bus.
#[derive(Default)]
pub struct ParserRegistry {
    parsers: Vec<Arc<dyn ChangeParser>>,
}

impl ParserRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the document, package and custom action
    /// parsers, using the icons from `settings`.
    pub fn with_defaults(settings: &NotifierSettings) -> Self {
        let mut registry = Self::new();
        registry.register(DocumentParser::new(settings.default_icon_url.clone()));
        registry.register(CompiledPackageParser::new(settings.control_icon_url.clone()));
        registry.register(CustomActionParser::new(settings.default_icon_url.clone()));
        registry
    }

    /// Adds a parser.
    pub fn register<P: ChangeParser + 'static>(&mut self, parser: P) {
        self.parsers.push(Arc::new(parser));
    }

    /// Names of the registered parsers, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.parsers.iter().map(|parser| parser.name()).collect()
    }

    /// Subscribes every parser to `ChangeEvent` on `bus`.
    ///
    /// Handlers hold only a weak reference to the bus, so they do not keep
    /// it alive.
    ///
    /// # Returns
    ///
    /// One subscription id per parser, for [`ParserRegistry::detach`].
    pub fn attach(&self, bus: &Arc<EventBus>) -> Vec<SubscriptionId> {
        self.parsers
            .iter()
            .map(|parser| {
                let parser = Arc::clone(parser);
                let bus_ref: Weak<EventBus> = Arc::downgrade(bus);
                bus.subscribe(move |event: &ChangeEvent| -> Result<()> {
                    dispatch(parser.as_ref(), &bus_ref, event);
                    Ok(())
                })
            })
            .collect()
    }

    /// Removes subscriptions created by [`ParserRegistry::attach`].
    pub fn detach(bus: &EventBus, ids: &[SubscriptionId]) {
        for id in ids {
            bus.unsubscribe::<ChangeEvent>(*id);
        }
    }
}

fn dispatch(parser: &dyn ChangeParser, bus: &Weak<EventBus>, event: &ChangeEvent) {
    if !parser.owns(&event.extension) {
        trace!("{} ignores {}", parser.name(), event.extension);
        return;
    }

    let Some(request) = parser.handle(event) else {
        return;
    };
    let Some(bus) = bus.upgrade() else {
        debug!("Bus dropped before {} could publish", parser.name());
        return;
    };

    debug!("{} produced notification for {:?}", parser.name(), event.path);
    bus.publish(request);
}

/// Local time of a parse attempt, as shown in notification bodies.
pub fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Title derived from the extension, e.g. `.TXT File Updated`.
pub fn update_title(extension: &str) -> String {
    format!("{} File Updated", extension.to_uppercase())
}

/// Body for files whose content is not shown.
pub fn revision_body() -> String {
    format!(
        "!! Hash Changed !!\n\n\tAssuming New Revision/Important Change Was Made @ {}",
        timestamp()
    )
}

/// Builds a request for `event` with the remaining fields filled in.
pub fn request_for(event: &ChangeEvent, body: String, icon_url: &str) -> NotificationRequest {
    NotificationRequest {
        file_name: event.file_name(),
        folder_path: event.folder_path().to_path_buf(),
        title: update_title(&event.extension),
        body,
        icon_url: icon_url.to_string(),
        custom_action: event.custom_action.clone(),
    }
}
