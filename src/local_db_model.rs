//! On-disk record format for the durable store.
//!
//! Each key holds a [`StoredEntry`]: the JSON value written by the
//! persistence layer plus a per-key revision used for compare-and-swap
//! writes.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{PortalError, PortalResult};

/// A serialized collection as it sits in the durable store.
///
/// ```rust
/// use study_portal_core::local_db_model::StoredEntry;
/// use serde_json::json;
///
/// let entry = StoredEntry {
///     key: "academicPrograms".to_string(),
///     revision: 3,
///     data: json!([{"id": "bsc", "name": "BSc"}]),
/// };
/// let bytes = entry.to_bytes()?;
/// assert_eq!(StoredEntry::from_bytes("academicPrograms", &bytes)?, entry);
/// # Ok::<(), study_portal_core::PortalError>(())
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StoredEntry {
    /// Storage key, e.g. `pdfDocuments`.
    pub key: String,

    /// Incremented on every successful write. An absent key is revision 0.
    pub revision: u64,

    /// The value as written by the caller.
    pub data: JsonValue,
}

impl StoredEntry {
    pub fn to_bytes(&self) -> PortalResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes an entry. Plain JSON written without the envelope (older
    /// writers stored bare values) is accepted as revision 0.
    pub fn from_bytes(key: &str, bytes: &[u8]) -> PortalResult<Self> {
        if let Ok(entry) = serde_json::from_slice::<StoredEntry>(bytes) {
            if entry.key == key {
                return Ok(entry);
            }
        }
        let data: JsonValue = serde_json::from_slice(bytes)?;
        Ok(StoredEntry {
            key: key.to_string(),
            revision: 0,
            data,
        })
    }

    /// Builds the entry that replaces `current`, enforcing the revision check.
    pub(crate) fn next(
        key: &str,
        current_revision: u64,
        data: &JsonValue,
        expected_revision: Option<u64>,
    ) -> PortalResult<Self> {
        if let Some(expected) = expected_revision {
            if expected != current_revision {
                return Err(PortalError::Conflict {
                    key: key.to_string(),
                    expected,
                    found: current_revision,
                });
            }
        }
        Ok(StoredEntry {
            key: key.to_string(),
            revision: current_revision + 1,
            data: data.clone(),
        })
    }
}
