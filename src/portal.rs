//! The origin and its tabs.
//!
//! An [`Origin`] is one browser profile: it owns the durable store, the
//! cross-tab notification bus and the body table, and lives as long as the
//! application process. Each [`Tab`] opened from it gets its own session
//! storage and its own same-tab bus.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;

use crate::body_table::BodyTable;
use crate::collections::{Comments, Documents, Likes, Programs, Viewer};
use crate::config::PortalConfig;
use crate::error::{PortalError, PortalResult};
use crate::events::{EventBus, TabId};
use crate::local_db_state::{DurableStore, LmdbStore, MemoryStore};
use crate::models::{default_documents, default_programs, DOCUMENTS_KEY, PROGRAMS_KEY};
use crate::session::CredentialGate;
use crate::sync::Persistence;

pub struct Origin {
    config: PortalConfig,
    store: Arc<dyn DurableStore>,
    storage_events: EventBus,
    bodies: BodyTable,
    next_tab: AtomicU64,
}

impl Origin {
    /// Opens (or creates) the LMDB-backed origin under `config.data_dir`.
    pub fn open(config: PortalConfig) -> PortalResult<Arc<Self>> {
        config.validate()?;
        let store = LmdbStore::open(
            &config.data_dir,
            config.map_size_bytes,
            config.durable_quota_bytes,
        )?;
        Self::with_store(config, Arc::new(store))
    }

    /// An origin whose durable store lives only in this process.
    pub fn in_memory(config: PortalConfig) -> PortalResult<Arc<Self>> {
        let store = MemoryStore::new(config.durable_quota_bytes);
        Self::with_store(config, Arc::new(store))
    }

    pub fn with_store(
        config: PortalConfig,
        store: Arc<dyn DurableStore>,
    ) -> PortalResult<Arc<Self>> {
        config.validate()?;
        let bodies = BodyTable::new(config.body_table_bytes);
        Ok(Arc::new(Self {
            config,
            store,
            storage_events: EventBus::new(),
            bodies,
            next_tab: AtomicU64::new(1),
        }))
    }

    pub fn open_tab(self: &Arc<Self>) -> Tab {
        let id = self.next_tab.fetch_add(1, Ordering::Relaxed);
        info!("Opened tab {id}");
        Tab {
            persistence: Persistence::new(id, Arc::clone(self)),
        }
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DurableStore> {
        &self.store
    }

    pub fn bodies(&self) -> &BodyTable {
        &self.bodies
    }

    pub(crate) fn storage_events(&self) -> &EventBus {
        &self.storage_events
    }

    /// Writes the default programs and documents for any collection that is
    /// not present yet. No notifications are fired. Returns how many
    /// collections were seeded.
    pub fn initialize_defaults(&self) -> PortalResult<usize> {
        let mut seeded = 0;
        if self.seed(PROGRAMS_KEY, &default_programs())? {
            seeded += 1;
        }
        if self.seed(DOCUMENTS_KEY, &default_documents())? {
            seeded += 1;
        }
        info!("Initialized {seeded} default collection(s)");
        Ok(seeded)
    }

    fn seed<T: Serialize>(&self, key: &str, value: &T) -> PortalResult<bool> {
        if self.store.get(key).ok().flatten().is_some() {
            return Ok(false);
        }
        let json = serde_json::to_value(value)?;
        // Revision 0 only matches an absent (or unreadable) key.
        match self.store.put(key, &json, Some(0)) {
            Ok(_) => Ok(true),
            Err(PortalError::Conflict { .. }) => Ok(false),
            Err(e) if e.is_quota() => {
                warn!("Could not seed '{key}': {e}");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

/// One open view tree. Dropping the tab discards its session storage and
/// the bodies that fell back to it.
pub struct Tab {
    persistence: Persistence,
}

impl Tab {
    pub fn id(&self) -> TabId {
        self.persistence.tab_id()
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    pub fn gate(&self) -> CredentialGate<'_> {
        CredentialGate::new(&self.persistence)
    }

    pub fn documents(&self) -> Documents<'_> {
        Documents::new(&self.persistence)
    }

    pub fn programs(&self) -> Programs<'_> {
        Programs::new(&self.persistence)
    }

    pub fn comments(&self) -> Comments<'_> {
        Comments::new(&self.persistence)
    }

    pub fn likes(&self) -> Likes<'_> {
        Likes::new(&self.persistence)
    }

    pub fn viewer(&self) -> Viewer<'_> {
        Viewer::new(&self.persistence)
    }
}
