//! Admin credential gate.
//!
//! The gate compares the submitted pair with the configured one and keeps
//! the resulting session in the tab's volatile store. The secret is shipped
//! with the application, so this is a UI gate only. Anything that needs
//! real access control has to verify credentials on a server.

use log::{debug, info, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::json;

use crate::error::{PortalError, PortalResult};
use crate::models::{SESSION_EVENT_KEY, SESSION_FLAG_KEY, SESSION_TOKEN_KEY};
use crate::routes::Route;
use crate::sync::Persistence;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggedIn,
}

pub struct CredentialGate<'a> {
    sync: &'a Persistence,
}

impl<'a> CredentialGate<'a> {
    pub(crate) fn new(sync: &'a Persistence) -> Self {
        Self { sync }
    }

    /// Checks the pair and, on success, opens a session and returns the
    /// dashboard route. A failed attempt leaves the session untouched.
    pub fn login(&self, username: &str, password: &str) -> PortalResult<Route> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(PortalError::validation("username and password are required"));
        }

        let config = self.sync.origin().config();
        if username != config.admin_username || password != config.admin_password {
            warn!("Rejected admin login for '{username}' in tab {}", self.sync.tab_id());
            return Err(PortalError::InvalidCredentials);
        }

        let token = generate_token(config.token_length);
        let volatile = self.sync.volatile();
        volatile.set_item(SESSION_FLAG_KEY, "true")?;
        if let Err(e) = volatile.set_item(SESSION_TOKEN_KEY, &token) {
            volatile.remove_item(SESSION_FLAG_KEY);
            return Err(e);
        }
        if config.mirror_session {
            self.sync.write(SESSION_FLAG_KEY, &"true");
            self.sync.write(SESSION_TOKEN_KEY, &token);
        }

        self.sync.notify_local(SESSION_EVENT_KEY, Some(json!(true)));
        info!("Admin session opened in tab {}", self.sync.tab_id());
        Ok(Route::AdminDashboard)
    }

    /// Clears the session and returns the landing route.
    pub fn logout(&self) -> Route {
        let volatile = self.sync.volatile();
        volatile.remove_item(SESSION_FLAG_KEY);
        volatile.remove_item(SESSION_TOKEN_KEY);
        if self.sync.origin().config().mirror_session {
            self.sync.remove(SESSION_FLAG_KEY);
            self.sync.remove(SESSION_TOKEN_KEY);
        }

        self.sync.notify_local(SESSION_EVENT_KEY, Some(json!(false)));
        info!("Admin session closed in tab {}", self.sync.tab_id());
        Route::Landing
    }

    /// Logged in only when the flag is exactly `"true"` and a token exists.
    /// A flag left behind without its token is cleared.
    pub fn state(&self) -> SessionState {
        let volatile = self.sync.volatile();
        let flag = volatile.get_item(SESSION_FLAG_KEY);
        let has_token = volatile.get_item(SESSION_TOKEN_KEY).is_some();

        match (flag.as_deref(), has_token) {
            (Some("true"), true) => SessionState::LoggedIn,
            (Some(_), false) => {
                debug!("Clearing stale admin flag in tab {}", self.sync.tab_id());
                volatile.remove_item(SESSION_FLAG_KEY);
                SessionState::LoggedOut
            }
            _ => SessionState::LoggedOut,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.state() == SessionState::LoggedIn
    }

    pub fn token(&self) -> Option<String> {
        match self.state() {
            SessionState::LoggedIn => self.sync.volatile().get_item(SESSION_TOKEN_KEY),
            SessionState::LoggedOut => None,
        }
    }

    /// Errors with `Forbidden` unless an admin session is open.
    pub fn require_admin(&self, action: &str) -> PortalResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(PortalError::Forbidden(format!("{action} requires an admin session")))
        }
    }
}

fn generate_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
