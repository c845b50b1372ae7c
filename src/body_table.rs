//! Application-scoped table of document bodies.
//!
//! Bodies are too large for the durable store quota, so they live here for
//! the lifetime of the [`Origin`](crate::portal::Origin) that owns the table.
//! Nothing in the table survives a process restart.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::{PortalError, PortalResult};

#[derive(Default)]
struct Entries {
    bodies: HashMap<String, String>,
    used: usize,
}

pub struct BodyTable {
    entries: Mutex<Entries>,
    capacity: usize,
}

impl BodyTable {
    /// A table holding at most `capacity` bytes of content. A zero capacity
    /// makes every insert fail, which forces callers onto their fallback.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            capacity,
        }
    }

    pub fn insert(&self, id: &str, content: &str) -> PortalResult<()> {
        let mut entries = self.entries.lock();
        let replaced = entries.bodies.get(id).map_or(0, String::len);
        let needed = entries.used - replaced + content.len();
        if needed > self.capacity {
            return Err(PortalError::QuotaExceeded {
                key: id.to_string(),
                needed,
                limit: self.capacity,
            });
        }
        entries.used = needed;
        entries.bodies.insert(id.to_string(), content.to_string());
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<String> {
        self.entries.lock().bodies.get(id).cloned()
    }

    pub fn remove(&self, id: &str) -> bool {
        let mut entries = self.entries.lock();
        match entries.bodies.remove(id) {
            Some(body) => {
                entries.used -= body.len();
                true
            }
            None => false,
        }
    }

    pub fn used_bytes(&self) -> usize {
        self.entries.lock().used
    }
}
