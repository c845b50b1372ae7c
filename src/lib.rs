//! # Study Portal Core
//!
//! Local persistence, change notification and admin gate for an offline
//! educational document portal: a public PDF library browsed by academic
//! program, a reader with comments and likes, and an admin dashboard for
//! documents and programs. There is no server; everything lives in an
//! LMDB-backed durable store shared by all tabs of one origin.
//!
//! ## Pieces
//!
//! - [`portal::Origin`] owns the durable store, the cross-tab event bus and
//!   the in-process body table. [`portal::Tab`] is one view tree with its own
//!   session storage and same-tab event bus.
//! - [`sync::Persistence`] writes collections, absorbs storage-quota failures
//!   and notifies subscribers on both channels.
//! - [`session::CredentialGate`] opens and closes the admin session. It is a
//!   UI gate, not access control.
//! - [`collections`] holds the read-modify-write helpers for documents,
//!   programs, comments, likes and the viewer identity.
//!
//! ## Quick Start
//!
//! ```no_run
//! use study_portal_core::{config::PortalConfig, portal::Origin};
//!
//! let origin = Origin::open(PortalConfig::with_data_dir("portal_data"))?;
//! origin.initialize_defaults()?;
//!
//! let tab = origin.open_tab();
//! let _sub = tab.persistence().subscribe("pdfDocuments", |change| {
//!     println!("documents changed via {:?}", change.channel);
//! });
//!
//! tab.gate().login("admin", "admin123")?;
//! let first = tab.documents().list_all()[0].id.clone();
//! tab.documents().toggle_hidden(&first)?;
//! # Ok::<(), study_portal_core::PortalError>(())
//! ```
//!
//! ## FFI Functions
//!
//! - [`portal_open`] / [`portal_close`] - origin lifecycle
//! - [`portal_open_tab`] / [`portal_close_tab`] - tab lifecycle
//! - [`portal_login`], [`portal_logout`], [`portal_is_admin`] - admin session
//! - [`portal_list_documents`] - catalog listing
//! - [`portal_toggle_like`], [`portal_add_comment`] - reader actions
//! - [`portal_free_string`] - release strings returned by this library

pub mod body_table;
pub mod collections;
pub mod config;
pub mod contact;
pub mod error;
pub mod events;
pub mod local_db_model;
pub mod local_db_state;
pub mod models;
pub mod portal;
pub mod routes;
pub mod session;
pub mod sync;
pub mod upload;
pub mod volatile_store;
mod app_response;

pub use crate::app_response::AppResponse;
pub use crate::error::{PortalError, PortalResult};

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::sync::Arc;

use log::{info, warn};

use crate::collections::DocumentFilter;
use crate::config::PortalConfig;
use crate::portal::{Origin, Tab};

/// Opaque origin handle handed across the C ABI.
pub struct PortalHandle {
    origin: Arc<Origin>,
}

/// Opens the origin described by a TOML config string (empty for defaults)
/// and seeds the default collections.
///
/// Returns null on failure.
///
/// # Safety
///
/// `config_toml` must be null or a valid null-terminated string.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn portal_open(config_toml: *const c_char) -> *mut PortalHandle {
    let raw = if config_toml.is_null() {
        String::new()
    } else {
        match unsafe { CStr::from_ptr(config_toml).to_str() } {
            Ok(s) => s.to_string(),
            Err(e) => {
                warn!("Invalid UTF-8 in config parameter: {e}");
                return std::ptr::null_mut();
            }
        }
    };

    let config = match PortalConfig::from_toml_str(&raw) {
        Ok(config) => config,
        Err(e) => {
            warn!("❌ Rejected portal config: {e}");
            return std::ptr::null_mut();
        }
    };

    let origin = match Origin::open(config) {
        Ok(origin) => origin,
        Err(e) => {
            warn!("❌ Failed to open portal storage: {e}");
            return std::ptr::null_mut();
        }
    };
    if let Err(e) = origin.initialize_defaults() {
        warn!("Default collections not written: {e}");
    }

    info!("✅ Portal opened");
    Box::into_raw(Box::new(PortalHandle { origin }))
}

/// Opens a tab on an origin. Returns null when `handle` is null.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn portal_open_tab(handle: *mut PortalHandle) -> *mut Tab {
    match unsafe { handle.as_ref() } {
        Some(handle) => Box::into_raw(Box::new(handle.origin.open_tab())),
        None => {
            warn!("Null handle passed to portal_open_tab");
            std::ptr::null_mut()
        }
    }
}

/// Checks admin credentials and returns the route to navigate to.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn portal_login(
    tab: *mut Tab,
    username: *const c_char,
    password: *const c_char,
) -> *const c_char {
    let username = match c_ptr_to_string(username, "username") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let password = match c_ptr_to_string(password, "password") {
        Ok(s) => s,
        Err(err) => return err,
    };

    with_tab(tab, "portal_login", |tab| match tab.gate().login(&username, &password) {
        Ok(route) => AppResponse::success(route.path()),
        Err(e) => AppResponse::from(e),
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn portal_logout(tab: *mut Tab) -> *const c_char {
    with_tab(tab, "portal_logout", |tab| {
        AppResponse::success(tab.gate().logout().path())
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn portal_is_admin(tab: *mut Tab) -> bool {
    match unsafe { tab.as_ref() } {
        Some(tab) => tab.gate().is_admin(),
        None => false,
    }
}

/// Lists documents as JSON. `include_hidden` is the admin view and needs an
/// admin session; otherwise only visible documents are returned.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn portal_list_documents(tab: *mut Tab, include_hidden: bool) -> *const c_char {
    with_tab(tab, "portal_list_documents", |tab| {
        if include_hidden {
            match tab.gate().require_admin("listing hidden documents") {
                Ok(()) => AppResponse::json(&tab.documents().list_all()),
                Err(e) => AppResponse::from(e),
            }
        } else {
            AppResponse::json(&tab.documents().list_public(&DocumentFilter::default()))
        }
    })
}

/// Toggles this tab's viewer like on a document and returns the aggregate.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn portal_toggle_like(tab: *mut Tab, document_id: *const c_char) -> *const c_char {
    let document_id = match c_ptr_to_string(document_id, "document_id") {
        Ok(s) => s,
        Err(err) => return err,
    };

    with_tab(tab, "portal_toggle_like", |tab| {
        let viewer_id = tab.viewer().id();
        match tab.likes().toggle(&document_id, &viewer_id) {
            Ok(record) => AppResponse::json(&record),
            Err(e) => AppResponse::from(e),
        }
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn portal_add_comment(
    tab: *mut Tab,
    document_id: *const c_char,
    author_name: *const c_char,
    text: *const c_char,
) -> *const c_char {
    let document_id = match c_ptr_to_string(document_id, "document_id") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let author_name = match c_ptr_to_string(author_name, "author_name") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let text = match c_ptr_to_string(text, "text") {
        Ok(s) => s,
        Err(err) => return err,
    };

    with_tab(tab, "portal_add_comment", |tab| {
        match tab.comments().add(&document_id, &author_name, &text) {
            Ok(comment) => AppResponse::json(&comment),
            Err(e) => AppResponse::from(e),
        }
    })
}

/// Drops a tab and its session storage.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn portal_close_tab(tab: *mut Tab) {
    if !tab.is_null() {
        drop(unsafe { Box::from_raw(tab) });
    }
}

/// Releases the origin handle. Tabs opened from it stay usable until closed.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn portal_close(handle: *mut PortalHandle) {
    if !handle.is_null() {
        drop(unsafe { Box::from_raw(handle) });
        info!("Portal handle released");
    }
}

/// Frees a string returned by any `portal_*` function.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn portal_free_string(ptr: *const c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr as *mut c_char) });
    }
}

fn with_tab<F>(tab: *mut Tab, op: &str, f: F) -> *const c_char
where
    F: FnOnce(&Tab) -> AppResponse,
{
    match unsafe { tab.as_ref() } {
        Some(tab) => response_to_c_string(&f(tab)),
        None => {
            let error = AppResponse::BadRequest(format!("Null tab pointer passed to {op}"));
            response_to_c_string(&error)
        }
    }
}

fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}
