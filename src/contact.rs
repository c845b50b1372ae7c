//! Contact form: validation and hand-off to a form relay.
//!
//! The crate does not speak HTTP. Hosts implement [`ContactRelay`] with
//! whatever client they have and the relay is called exactly once per
//! submission.

use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::PortalConfig;
use crate::error::{PortalError, PortalResult};

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactMessage {
    pub fn validate(&self) -> PortalResult<()> {
        let blank = [&self.name, &self.email, &self.subject, &self.message]
            .iter()
            .any(|field| field.trim().is_empty());
        if blank {
            return Err(PortalError::validation("please fill in all required fields"));
        }
        if !EMAIL.is_match(self.email.trim()) {
            return Err(PortalError::validation("please enter a valid email address"));
        }
        Ok(())
    }
}

/// Body posted to the relay endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormRelayPayload {
    pub endpoint: String,
    pub fields: ContactMessage,
}

pub trait ContactRelay {
    fn deliver(&self, payload: &FormRelayPayload) -> PortalResult<()>;
}

/// Validates `message` and hands it to `relay`, addressed to the
/// configured `contact_endpoint`. No retry on failure.
pub fn submit<R: ContactRelay + ?Sized>(
    relay: &R,
    config: &PortalConfig,
    message: ContactMessage,
) -> PortalResult<()> {
    message.validate()?;
    let endpoint = config
        .contact_endpoint
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| PortalError::Config("no contact endpoint configured".to_string()))?;

    let payload = FormRelayPayload {
        endpoint: endpoint.to_string(),
        fields: message,
    };
    match relay.deliver(&payload) {
        Ok(()) => {
            info!("Contact message from {} relayed", payload.fields.email);
            Ok(())
        }
        Err(e) => {
            warn!("Contact relay failed: {e}");
            Err(e)
        }
    }
}
