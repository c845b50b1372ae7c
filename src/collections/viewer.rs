use log::{info, warn};
use uuid::Uuid;

use crate::models::{Actor, VIEWER_ID_KEY, VIEWER_NAME_KEY};
use crate::session::CredentialGate;
use crate::sync::{Persistence, WriteOutcome};

/// The weak, per-origin identity used for comment and like ownership.
pub struct Viewer<'a> {
    sync: &'a Persistence,
}

impl<'a> Viewer<'a> {
    pub(crate) fn new(sync: &'a Persistence) -> Self {
        Self { sync }
    }

    /// The origin's viewer id, generated and persisted on first use. When
    /// the durable store cannot take it, the id is kept in this tab's
    /// volatile store so it stays stable for the tab's lifetime.
    pub fn id(&self) -> String {
        if let Some(id) = self.sync.read::<String>(VIEWER_ID_KEY) {
            return id;
        }
        let volatile = self.sync.volatile();
        if let Some(id) = volatile.get_item(VIEWER_ID_KEY) {
            return id;
        }

        let fresh = format!("viewer-{}", Uuid::new_v4().simple());
        let result = self.sync.update(
            VIEWER_ID_KEY,
            || None,
            |current: &mut Option<String>| Ok(current.get_or_insert_with(|| fresh.clone()).clone()),
        );
        let id = match result {
            Ok((id, outcome)) if outcome.is_persisted() => {
                info!("Viewer id is {id}");
                return id;
            }
            Ok((id, _)) => {
                warn!("Viewer id {id} not persisted, keeping it for this tab only");
                id
            }
            Err(e) => {
                warn!("Could not persist viewer id, keeping {fresh} for this tab only: {e}");
                fresh
            }
        };
        if let Err(e) = volatile.set_item(VIEWER_ID_KEY, &id) {
            warn!("Tab storage rejected viewer id: {e}");
        }
        id
    }

    /// The display name last used for a comment, if any.
    pub fn name(&self) -> Option<String> {
        self.sync.read(VIEWER_NAME_KEY)
    }

    pub fn set_name(&self, name: &str) -> WriteOutcome {
        self.sync.write(VIEWER_NAME_KEY, &name.trim())
    }

    /// This tab's viewer, flagged as admin when a session is open.
    pub fn actor(&self) -> Actor {
        Actor {
            viewer_id: self.id(),
            is_admin: CredentialGate::new(self.sync).is_admin(),
        }
    }
}
