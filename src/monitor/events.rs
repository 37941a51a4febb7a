//! Raw file system event classification and routing.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::Path,
};

use {
    notify::{
        Error, Event,
        event::{EventKind, ModifyKind},
    },
    tracing::{debug, error, trace},
};

use crate::{
    config::{ExtensionRule, WatchedFolder, normalize_extension},
    monitor::debouncer::DebounceEngine,
};

/// Kinds of raw events the coordinator distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEventKind {
    Created,
    Modified,
    Renamed,
    Deleted,
}

impl RawEventKind {
    /// Maps a `notify` event kind, ignoring access and metadata-only events.
    pub fn from_notify(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Renamed),
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(Self::Modified),
            EventKind::Remove(_) => Some(Self::Deleted),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
        }
    }
}

impl Display for RawEventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let label = match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Renamed => "renamed",
            Self::Deleted => "deleted",
        };
        f.write_str(label)
    }
}

/// What to do with one raw event for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventRoute {
    /// Forward to the debounce engine under this rule.
    Debounce(ExtensionRule),
    /// Record at debug level only.
    LogOnly,
    /// Not interesting for this folder.
    Drop,
}

/// Lowercase, dot-prefixed extension of `path`, if it has one.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|extension| normalize_extension(&extension.to_string_lossy()))
}

/// Decides how a raw event for `path` inside `folder` is handled.
///
/// Renames and deletions are only ever logged. Creations and
/// modifications are forwarded when the extension matches one of the
/// folder's rules, or unconditionally when the folder has no rules.
pub fn route_event(folder: &WatchedFolder, kind: RawEventKind, path: &Path) -> EventRoute {
    match kind {
        RawEventKind::Renamed | RawEventKind::Deleted => EventRoute::LogOnly,
        RawEventKind::Created | RawEventKind::Modified => {
            let extension = extension_of(path);

            if folder.extensions.is_empty() {
                return EventRoute::Debounce(ExtensionRule {
                    extension: extension.unwrap_or_default(),
                    custom_action: None,
                });
            }

            extension
                .and_then(|extension| folder.rule_for(&extension).cloned())
                .map_or(EventRoute::Drop, EventRoute::Debounce)
        }
    }
}

/// Handles a raw `notify` callback for one watched folder.
pub fn dispatch_raw_event(
    result: Result<Event, Error>,
    folder: &WatchedFolder,
    engine: &DebounceEngine,
) {
    let event = match result {
        Ok(event) => event,
        Err(e) => {
            error!("File system watcher error in {:?}: {}", folder.path, e);
            return;
        }
    };

    let Some(kind) = RawEventKind::from_notify(&event.kind) else {
        trace!("Ignoring event kind {:?} for {:?}", event.kind, event.paths);
        return;
    };

    for path in &event.paths {
        match route_event(folder, kind, path) {
            EventRoute::Debounce(rule) => {
                debug!("Raw file {}: {:?}", kind, path);
                engine.touch(path.clone(), rule);
            }
            EventRoute::LogOnly => debug!("File {}: {:?}", kind, path),
            EventRoute::Drop => trace!("Ignoring unwatched extension: {:?}", path),
        }
    }
}
