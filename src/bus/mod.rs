//! In-process typed publish/subscribe.
//!
//! The `EventBus` routes messages to handlers registered for the exact
//! message type. Publishing is synchronous: every handler runs on the
//! publisher's thread before `publish` returns. Handlers are isolated from
//! each other, so a failing or panicking handler is reported and skipped.

use std::{
    any::{Any, TypeId, type_name},
    collections::HashMap,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use {
    anyhow::{Result, anyhow},
    parking_lot::RwLock,
    tracing::trace,
};

use crate::error::ErrorReporter;

pub mod messages;

pub use messages::{ChangeEvent, MonitorStatus, NotificationRequest, StatusLevel};

type Handler = Arc<dyn Fn(&dyn Any) -> Result<()> + Send + Sync>;

/// Token returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    handler: Handler,
}

/// Outcome of a single publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Handlers that completed successfully.
    pub handled: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

/// Process-wide typed message bus.
///
/// The bus is an ordinary value; share it with `Arc<EventBus>` rather than
/// through a global.
#[derive(Default)]
pub struct EventBus {
    /// Subscribers per message type, in subscription order.
    subscribers: RwLock<HashMap<TypeId, Vec<Subscriber>>>,
    /// Source of subscription ids.
    next_id: AtomicU64,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `handler` to messages of type `M`.
    ///
    /// # Arguments
    ///
    /// * `handler` - Called with every published `M`. An `Err` is reported
    ///   through the error reporter and does not affect other handlers.
    ///
    /// # Returns
    ///
    /// The id to pass to [`EventBus::unsubscribe`].
    pub fn subscribe<M, F>(&self, handler: F) -> SubscriptionId
    where
        M: Any + Send + Sync,
        F: Fn(&M) -> Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handler: Handler = Arc::new(move |message: &dyn Any| {
            match message.downcast_ref::<M>() {
                Some(message) => handler(message),
                None => Ok(()),
            }
        });

        self.subscribers
            .write()
            .entry(TypeId::of::<M>())
            .or_default()
            .push(Subscriber { id, handler });

        trace!(message = type_name::<M>(), ?id, "Subscribed");
        id
    }

    /// Removes a subscription for message type `M`.
    ///
    /// # Returns
    ///
    /// `true` if the subscription existed.
    pub fn unsubscribe<M: Any>(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let Some(handlers) = subscribers.get_mut(&TypeId::of::<M>()) else {
            return false;
        };

        let before = handlers.len();
        handlers.retain(|subscriber| subscriber.id != id);
        before != handlers.len()
    }

    /// Number of handlers currently subscribed to `M`.
    pub fn subscriber_count<M: Any>(&self) -> usize {
        self.subscribers
            .read()
            .get(&TypeId::of::<M>())
            .map_or(0, Vec::len)
    }

    /// Delivers `message` to every handler subscribed to `M`.
    ///
    /// The subscriber list is snapshotted first and no lock is held while
    /// handlers run, so handlers may publish, subscribe or unsubscribe.
    pub fn publish<M: Any + Send + Sync>(&self, message: M) -> PublishReport {
        let snapshot: Vec<(SubscriptionId, Handler)> = self
            .subscribers
            .read()
            .get(&TypeId::of::<M>())
            .map(|handlers| {
                handlers
                    .iter()
                    .map(|subscriber| (subscriber.id, Arc::clone(&subscriber.handler)))
                    .collect()
            })
            .unwrap_or_default();

        let mut report = PublishReport::default();
        for (id, handler) in snapshot {
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(&message)));
            let error = match outcome {
                Ok(Ok(())) => {
                    report.handled += 1;
                    continue;
                }
                Ok(Err(error)) => error,
                Err(panic) => anyhow!("handler panicked: {}", panic_message(panic.as_ref())),
            };

            report.failed += 1;
            ErrorReporter::error(&error, &format!("{} handler {:?}", type_name::<M>(), id));
        }

        report
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
