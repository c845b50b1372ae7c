//! Change notification.
//!
//! Two delivery channels exist. Every tab owns a same-tab bus that sees its
//! own writes; the origin owns a cross-tab bus that delivers a write to every
//! tab except the one that made it.

use std::sync::{Arc, Weak};

use log::debug;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;

pub type TabId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Fired in the writing tab, carrying the in-memory value.
    SameTab,
    /// Fired in every other tab after the durable store changed.
    CrossTab,
}

/// A change notification for one storage key.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub key: String,
    /// The new value; `None` when the key was removed.
    pub value: Option<JsonValue>,
    pub channel: Channel,
    /// The tab that made the change.
    pub source_tab: TabId,
}

pub type Callback = Arc<dyn Fn(&StorageChange) + Send + Sync>;

struct Listener {
    id: u64,
    key: String,
    skip_source: Option<TabId>,
    callback: Callback,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    listeners: Vec<Listener>,
}

#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for changes to `key`. Changes whose source is
    /// `skip_source` are not delivered to it.
    pub(crate) fn register(
        &self,
        key: &str,
        skip_source: Option<TabId>,
        callback: Callback,
    ) -> Registration {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.listeners.push(Listener {
            id,
            key: key.to_string(),
            skip_source,
            callback,
        });
        Registration {
            bus: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Delivers `change` to every matching listener and returns how many were
    /// called. Callbacks run without the bus lock held, so they may write.
    pub fn emit(&self, change: &StorageChange) -> usize {
        let targets: Vec<Callback> = {
            let inner = self.inner.lock();
            inner
                .listeners
                .iter()
                .filter(|l| l.key == change.key && l.skip_source != Some(change.source_tab))
                .map(|l| Arc::clone(&l.callback))
                .collect()
        };
        for callback in &targets {
            callback(change);
        }
        if !targets.is_empty() {
            debug!(
                "Delivered '{}' ({:?}) to {} listener(s)",
                change.key,
                change.channel,
                targets.len()
            );
        }
        targets.len()
    }

    pub fn listener_count(&self, key: &str) -> usize {
        self.inner
            .lock()
            .listeners
            .iter()
            .filter(|l| l.key == key)
            .count()
    }
}

/// One listener slot on one bus.
pub(crate) struct Registration {
    bus: Weak<Mutex<BusInner>>,
    id: u64,
}

impl Registration {
    fn cancel(&self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.lock().listeners.retain(|l| l.id != self.id);
        }
    }
}

/// Handle returned by [`Persistence::subscribe`](crate::sync::Persistence::subscribe).
///
/// Dropping it removes the listener from both channels.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    registrations: Vec<Registration>,
}

impl Subscription {
    pub(crate) fn new(registrations: Vec<Registration>) -> Self {
        Self { registrations }
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for registration in &self.registrations {
            registration.cancel();
        }
    }
}
