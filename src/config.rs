//! Runtime configuration for an [`Origin`](crate::portal::Origin).
//!
//! Every field has a default, so an empty TOML document is a valid config.
//!
//! ```toml
//! data_dir = "portal_data"
//! durable_quota_bytes = 5242880
//! admin_username = "admin"
//! admin_password = "admin123"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PortalError, PortalResult};

const MIB: usize = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PortalConfig {
    /// Directory holding the LMDB environment. Created on open.
    pub data_dir: PathBuf,
    /// LMDB map size. Must be larger than `durable_quota_bytes`.
    pub map_size_bytes: usize,
    /// Total bytes (keys plus serialized values) the durable store accepts,
    /// mirroring the ~5MB browser local storage limit.
    pub durable_quota_bytes: usize,
    /// Per-tab volatile store limit.
    pub session_quota_bytes: usize,
    /// Capacity of the in-process body table. Zero disables it.
    pub body_table_bytes: usize,
    pub admin_username: String,
    pub admin_password: String,
    pub token_length: usize,
    /// Also persist the admin flag and token in the durable store.
    pub mirror_session: bool,
    pub max_write_attempts: u32,
    pub contact_endpoint: Option<String>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("portal_data"),
            map_size_bytes: 10 * MIB,
            durable_quota_bytes: 5 * MIB,
            session_quota_bytes: 5 * MIB,
            body_table_bytes: 64 * MIB,
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
            token_length: 16,
            mirror_session: false,
            max_write_attempts: 3,
            contact_endpoint: None,
        }
    }
}

impl PortalConfig {
    pub fn from_toml_str(raw: &str) -> PortalResult<Self> {
        let config: PortalConfig =
            toml::from_str(raw).map_err(|e| PortalError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> PortalResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Config rooted at `data_dir` with everything else defaulted.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> PortalResult<()> {
        if self.admin_username.trim().is_empty() || self.admin_password.is_empty() {
            return Err(PortalError::Config(
                "admin credentials must not be empty".to_string(),
            ));
        }
        if self.token_length == 0 {
            return Err(PortalError::Config("token_length must be positive".to_string()));
        }
        if self.max_write_attempts == 0 {
            return Err(PortalError::Config(
                "max_write_attempts must be positive".to_string(),
            ));
        }
        if self.map_size_bytes <= self.durable_quota_bytes {
            return Err(PortalError::Config(format!(
                "map_size_bytes ({}) must exceed durable_quota_bytes ({})",
                self.map_size_bytes, self.durable_quota_bytes
            )));
        }
        Ok(())
    }
}
