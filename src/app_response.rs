use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeError;

use crate::error::PortalError;

/// JSON envelope returned across the C ABI.
#[derive(Debug, Serialize, Deserialize)]
pub enum AppResponse {
    DatabaseError(String),
    SerializationError(String),
    NotFound(String),
    ValidationError(String),
    Unauthorized(String),
    Conflict(String),
    BadRequest(String),
    Ok(String),
}

impl AppResponse {
    /// Label and message, as shown by `Display`.
    fn parts(&self) -> (&'static str, &str) {
        match self {
            AppResponse::DatabaseError(msg) => ("Database error", msg),
            AppResponse::SerializationError(msg) => ("Serialization error", msg),
            AppResponse::NotFound(msg) => ("Not found", msg),
            AppResponse::ValidationError(msg) => ("Validation error", msg),
            AppResponse::Unauthorized(msg) => ("Unauthorized", msg),
            AppResponse::Conflict(msg) => ("Conflict", msg),
            AppResponse::BadRequest(msg) => ("Bad Request", msg),
            AppResponse::Ok(msg) => ("Ok", msg),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, AppResponse::Ok(_))
    }
}

impl Display for AppResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (label, msg) = self.parts();
        write!(f, "{label}: {msg}")
    }
}

impl From<PortalError> for AppResponse {
    fn from(err: PortalError) -> Self {
        let msg = err.to_string();
        match err {
            PortalError::Validation(_) | PortalError::Duplicate(_) => {
                AppResponse::ValidationError(msg)
            }
            PortalError::InvalidCredentials | PortalError::Forbidden(_) => {
                AppResponse::Unauthorized(msg)
            }
            PortalError::NotFound(_) => AppResponse::NotFound(msg),
            PortalError::Conflict { .. } => AppResponse::Conflict(msg),
            PortalError::Serialization(_) => AppResponse::SerializationError(msg),
            PortalError::Config(_) | PortalError::Relay(_) => AppResponse::BadRequest(msg),
            PortalError::QuotaExceeded { .. } | PortalError::Storage(_) | PortalError::Io(_) => {
                AppResponse::DatabaseError(msg)
            }
        }
    }
}

impl From<SerdeError> for AppResponse {
    fn from(err: SerdeError) -> Self {
        AppResponse::SerializationError(format!("could not encode response: {err}"))
    }
}

impl AppResponse {
    pub fn success(msg: impl Into<String>) -> Self {
        AppResponse::Ok(msg.into())
    }

    /// Serializes `value` into an `Ok` envelope.
    pub fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(json) => AppResponse::Ok(json),
            Err(e) => AppResponse::from(e),
        }
    }
}
