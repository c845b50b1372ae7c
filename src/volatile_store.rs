//! Tab-scoped string storage, the counterpart of browser session storage.
//! Contents vanish when the owning [`Tab`](crate::portal::Tab) is dropped.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::{PortalError, PortalResult};

pub struct VolatileStore {
    items: Mutex<HashMap<String, String>>,
    quota: usize,
}

impl VolatileStore {
    pub fn new(quota: usize) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            quota,
        }
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().get(key).cloned()
    }

    pub fn set_item(&self, key: &str, value: &str) -> PortalResult<()> {
        let mut items = self.items.lock();
        let used: usize = items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        let needed = used + key.len() + value.len();
        if needed > self.quota {
            return Err(PortalError::QuotaExceeded {
                key: key.to_string(),
                needed,
                limit: self.quota,
            });
        }
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn remove_item(&self, key: &str) -> bool {
        self.items.lock().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
