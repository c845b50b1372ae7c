//! Persistence and synchronization for one tab.
//!
//! [`Persistence`] is the only path by which collections reach the durable
//! store. Every write is announced twice: on the tab's own bus and, when the
//! durable store actually changed, on the origin's cross-tab bus.

use std::sync::Arc;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::{PortalError, PortalResult};
use crate::events::{Channel, EventBus, StorageChange, Subscription, TabId};
use crate::models::{body_key, DOCUMENTS_KEY};
use crate::portal::Origin;
use crate::volatile_store::VolatileStore;

/// What a write managed to persist. Subscribers in the writing tab are
/// notified in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Persisted { revision: u64 },
    /// The documents collection only fit after inline bodies were dropped.
    PersistedWithoutBodies { revision: u64 },
    NotPersisted,
}

impl WriteOutcome {
    pub fn is_persisted(&self) -> bool {
        !matches!(self, WriteOutcome::NotPersisted)
    }
}

pub struct Persistence {
    tab_id: TabId,
    origin: Arc<Origin>,
    volatile: VolatileStore,
    local_events: EventBus,
}

impl Persistence {
    pub(crate) fn new(tab_id: TabId, origin: Arc<Origin>) -> Self {
        let volatile = VolatileStore::new(origin.config().session_quota_bytes);
        Self {
            tab_id,
            origin,
            volatile,
            local_events: EventBus::new(),
        }
    }

    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    pub fn origin(&self) -> &Arc<Origin> {
        &self.origin
    }

    /// The tab's session storage.
    pub fn volatile(&self) -> &VolatileStore {
        &self.volatile
    }

    /// Serializes and stores `value`, then notifies subscribers.
    ///
    /// Never fails. A capacity failure on the documents collection is retried
    /// once with every record's inline `content` removed; any remaining
    /// failure is logged and reported as [`WriteOutcome::NotPersisted`].
    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> WriteOutcome {
        let json = match serde_json::to_value(value) {
            Ok(json) => json,
            Err(e) => {
                warn!("Could not serialize value for '{key}': {e}");
                return WriteOutcome::NotPersisted;
            }
        };
        match self.write_json(key, json, None) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Write to '{key}' failed: {e}");
                WriteOutcome::NotPersisted
            }
        }
    }

    /// Core write. Capacity failures are absorbed; revision conflicts and
    /// storage faults are returned.
    pub(crate) fn write_json(
        &self,
        key: &str,
        value: JsonValue,
        expected_revision: Option<u64>,
    ) -> PortalResult<WriteOutcome> {
        let store = self.origin.store();
        let (outcome, persisted) = match store.put(key, &value, expected_revision) {
            Ok(entry) => (
                WriteOutcome::Persisted {
                    revision: entry.revision,
                },
                Some(entry.data),
            ),
            Err(e) if e.is_quota() && key == DOCUMENTS_KEY => {
                warn!("Documents exceed the storage quota, retrying without inline bodies: {e}");
                let stripped = strip_inline_bodies(&value);
                match store.put(key, &stripped, expected_revision) {
                    Ok(entry) => (
                        WriteOutcome::PersistedWithoutBodies {
                            revision: entry.revision,
                        },
                        Some(entry.data),
                    ),
                    Err(e) if e.is_quota() => {
                        warn!("Documents still exceed the storage quota, not persisted: {e}");
                        (WriteOutcome::NotPersisted, None)
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) if e.is_quota() => {
                warn!("'{key}' not persisted: {e}");
                (WriteOutcome::NotPersisted, None)
            }
            Err(e) => return Err(e),
        };

        self.notify_local(key, Some(value));
        if let Some(stored) = persisted {
            self.origin.storage_events().emit(&StorageChange {
                key: key.to_string(),
                value: Some(stored),
                channel: Channel::CrossTab,
                source_tab: self.tab_id,
            });
        }
        Ok(outcome)
    }

    /// Reads and decodes `key`. Missing keys, unreadable bytes and values of
    /// the wrong shape all come back as `None`.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.read_versioned(key).1
    }

    pub(crate) fn read_versioned<T: DeserializeOwned>(&self, key: &str) -> (u64, Option<T>) {
        match self.origin.store().get(key) {
            Ok(Some(entry)) => match serde_json::from_value(entry.data) {
                Ok(value) => (entry.revision, Some(value)),
                Err(e) => {
                    warn!("Discarding malformed value at '{key}': {e}");
                    (entry.revision, None)
                }
            },
            Ok(None) => (0, None),
            Err(e) => {
                warn!("Could not read '{key}': {e}");
                (0, None)
            }
        }
    }

    /// Deletes `key` and announces the removal.
    pub fn remove(&self, key: &str) -> bool {
        let removed = match self.origin.store().remove(key) {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Could not remove '{key}': {e}");
                false
            }
        };
        self.notify_local(key, None);
        if removed {
            self.origin.storage_events().emit(&StorageChange {
                key: key.to_string(),
                value: None,
                channel: Channel::CrossTab,
                source_tab: self.tab_id,
            });
        }
        removed
    }

    /// Read-modify-write of one collection with a revision check. The
    /// collection is seeded from `seed` when absent. On a concurrent change
    /// the mutation is re-applied to the fresh value.
    pub(crate) fn update<T, R, S, F>(
        &self,
        key: &str,
        seed: S,
        mut mutate: F,
    ) -> PortalResult<(R, WriteOutcome)>
    where
        T: Serialize + DeserializeOwned,
        S: Fn() -> T,
        F: FnMut(&mut T) -> PortalResult<R>,
    {
        let attempts = self.origin.config().max_write_attempts;
        let mut last_conflict = None;
        for attempt in 1..=attempts {
            let (revision, current) = self.read_versioned::<T>(key);
            let mut value = current.unwrap_or_else(&seed);
            let result = mutate(&mut value)?;
            let json = serde_json::to_value(&value)?;
            match self.write_json(key, json, Some(revision)) {
                Ok(outcome) => return Ok((result, outcome)),
                Err(conflict @ PortalError::Conflict { .. }) => {
                    debug!("Attempt {attempt}/{attempts} on '{key}' lost a race: {conflict}");
                    last_conflict = Some(conflict);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_conflict.unwrap_or_else(|| PortalError::Conflict {
            key: key.to_string(),
            expected: 0,
            found: 0,
        }))
    }

    /// Registers `callback` on both channels for `key`.
    pub fn subscribe<F>(&self, key: &str, callback: F) -> Subscription
    where
        F: Fn(&StorageChange) + Send + Sync + 'static,
    {
        let callback: crate::events::Callback = Arc::new(callback);
        let same_tab = self.local_events.register(key, None, Arc::clone(&callback));
        let cross_tab = self.origin.storage_events().register(
            key,
            Some(self.tab_id),
            Arc::new(move |change: &StorageChange| {
                // Removals carry no value, as with a null `newValue`.
                if change.value.is_some() {
                    callback(change);
                }
            }),
        );
        Subscription::new(vec![same_tab, cross_tab])
    }

    /// Fires a same-tab notification without touching storage.
    pub(crate) fn notify_local(&self, key: &str, value: Option<JsonValue>) {
        self.local_events.emit(&StorageChange {
            key: key.to_string(),
            value,
            channel: Channel::SameTab,
            source_tab: self.tab_id,
        });
    }

    /// Stores a document body, preferring the origin's body table and
    /// falling back to this tab's volatile store. Returns whether either
    /// tier accepted it.
    pub fn store_body(&self, id: &str, content: &str) -> bool {
        match self.origin.bodies().insert(id, content) {
            Ok(()) => true,
            Err(e) => {
                debug!("Body table rejected '{id}', using tab storage: {e}");
                match self.volatile.set_item(&body_key(id), content) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Body for '{id}' could not be stored: {e}");
                        false
                    }
                }
            }
        }
    }

    pub fn get_body(&self, id: &str) -> Option<String> {
        self.origin
            .bodies()
            .get(id)
            .or_else(|| self.volatile.get_item(&body_key(id)))
    }

    pub fn remove_body(&self, id: &str) {
        self.origin.bodies().remove(id);
        self.volatile.remove_item(&body_key(id));
    }
}

/// Removes the inline `content` field from every document record and marks
/// those records as having no body.
fn strip_inline_bodies(value: &JsonValue) -> JsonValue {
    let mut stripped = value.clone();
    if let Some(records) = stripped.as_array_mut() {
        for record in records.iter_mut().filter_map(JsonValue::as_object_mut) {
            if record.remove("content").is_some() {
                record.insert("hasContent".to_string(), JsonValue::Bool(false));
            }
        }
    }
    stripped
}

