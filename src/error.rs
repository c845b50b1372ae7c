//! Error type shared by every layer of the portal core.

use thiserror::Error;

/// Errors surfaced by the storage, session and collection layers.
///
/// Capacity failures on [`crate::sync::Persistence::write`] never reach the
/// caller as an error; they are recovered inside the write and reported via
/// [`crate::sync::WriteOutcome`]. `QuotaExceeded` is only seen by code that
/// talks to a store directly.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("not allowed: {0}")]
    Forbidden(String),

    #[error("already exists: {0}")]
    Duplicate(String),

    #[error("storage quota exceeded writing '{key}' ({needed} bytes, limit {limit})")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },

    #[error("'{key}' changed concurrently (expected revision {expected}, found {found})")]
    Conflict { key: String, expected: u64, found: u64 },

    #[error("storage error: {0}")]
    Storage(#[from] lmdb::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("contact relay failed: {0}")]
    Relay(String),
}

impl PortalError {
    pub fn validation(msg: impl Into<String>) -> Self {
        PortalError::Validation(msg.into())
    }

    /// True for the storage-capacity family of failures.
    pub fn is_quota(&self) -> bool {
        matches!(
            self,
            PortalError::QuotaExceeded { .. } | PortalError::Storage(lmdb::Error::MapFull)
        )
    }
}

pub type PortalResult<T> = Result<T, PortalError>;
