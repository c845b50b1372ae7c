//! Navigation targets the host UI can render, and the dashboard guard.

use std::fmt::{Display, Formatter};

use log::debug;

use crate::session::CredentialGate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Landing,
    Library { category: Option<String> },
    Reader { document_id: String },
    Upload,
    Contact,
    AdminLogin,
    AdminDashboard,
    NotFound(String),
}

impl Route {
    pub fn parse(raw: &str) -> Self {
        let (path, query) = match raw.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (raw, None),
        };
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        match path {
            "/" => Route::Landing,
            "/library" => Route::Library {
                category: query.and_then(|q| query_param(q, "category")),
            },
            "/upload" => Route::Upload,
            "/contact" => Route::Contact,
            "/admin" => Route::AdminLogin,
            "/admin/dashboard" => Route::AdminDashboard,
            other => match other.strip_prefix("/read/") {
                Some(id) if !id.is_empty() && !id.contains('/') => Route::Reader {
                    document_id: id.to_string(),
                },
                _ => Route::NotFound(raw.to_string()),
            },
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Landing => "/".to_string(),
            Route::Library { category: None } => "/library".to_string(),
            Route::Library {
                category: Some(category),
            } => format!("/library?category={}", urlencoding::encode(category)),
            Route::Reader { document_id } => format!("/read/{document_id}"),
            Route::Upload => "/upload".to_string(),
            Route::Contact => "/contact".to_string(),
            Route::AdminLogin => "/admin".to_string(),
            Route::AdminDashboard => "/admin/dashboard".to_string(),
            Route::NotFound(raw) => raw.clone(),
        }
    }

    pub fn requires_admin(&self) -> bool {
        matches!(self, Route::AdminDashboard)
    }

    /// Where the tab actually lands: admin-only routes redirect to the login
    /// route without a valid session.
    pub fn guard(self, gate: &CredentialGate<'_>) -> Route {
        if self.requires_admin() && !gate.is_admin() {
            debug!("Redirecting {} to the admin login", self.path());
            return Route::AdminLogin;
        }
        self
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

fn query_param(query: &str, name: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| match urlencoding::decode(value) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => value.to_string(),
        })
}
