use chrono::Local;
use log::{info, warn};
use uuid::Uuid;

use crate::error::{PortalError, PortalResult};
use crate::models::{default_documents, Document, DOCUMENTS_KEY};
use crate::session::CredentialGate;
use crate::sync::{Persistence, WriteOutcome};
use crate::upload::DocumentUpload;

use super::Programs;

/// Label shown for documents whose program no longer exists.
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewDocument {
    pub title: String,
    pub description: String,
    pub category: String,
    pub page_count: u32,
    /// Encoded file payload, stored apart from the record.
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEdit {
    pub title: String,
    pub description: String,
    pub category: String,
}

/// Public catalog filter. Both parts are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    /// Program id.
    pub category: Option<String>,
    /// Case-insensitive match on title, description or category.
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedDocument {
    pub document: Document,
    pub outcome: WriteOutcome,
}

impl AddedDocument {
    /// True when both the record and its body were stored.
    pub fn fully_stored(&self) -> bool {
        self.document.has_body && matches!(self.outcome, WriteOutcome::Persisted { .. })
    }
}

pub struct Documents<'a> {
    sync: &'a Persistence,
}

impl<'a> Documents<'a> {
    pub(crate) fn new(sync: &'a Persistence) -> Self {
        Self { sync }
    }

    /// Every document, hidden ones included, in insertion order.
    pub fn list_all(&self) -> Vec<Document> {
        self.sync
            .read(DOCUMENTS_KEY)
            .unwrap_or_else(default_documents)
    }

    /// Visible documents matching `filter`.
    pub fn list_public(&self, filter: &DocumentFilter) -> Vec<Document> {
        let programs = Programs::new(self.sync);
        let needle = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        self.list_all()
            .into_iter()
            .filter(|doc| !doc.hidden)
            .filter(|doc| {
                filter
                    .category
                    .as_deref()
                    .map_or(true, |category| doc.category == category)
            })
            .filter(|doc| match &needle {
                None => true,
                Some(needle) => {
                    let label = programs.name_of(&doc.category).unwrap_or_default();
                    [&doc.title, &doc.description, &doc.category, &label]
                        .iter()
                        .any(|field| field.to_lowercase().contains(needle.as_str()))
                }
            })
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Document> {
        self.list_all().into_iter().find(|doc| doc.id == id)
    }

    /// Documents whose category does not name an existing program.
    pub fn uncategorized(&self) -> Vec<Document> {
        let programs = Programs::new(self.sync).list();
        self.list_all()
            .into_iter()
            .filter(|doc| !programs.iter().any(|p| p.id == doc.category))
            .collect()
    }

    /// The program name for the document's category, or [`UNCATEGORIZED`].
    pub fn category_label(&self, doc: &Document) -> String {
        Programs::new(self.sync)
            .name_of(&doc.category)
            .unwrap_or_else(|| UNCATEGORIZED.to_string())
    }

    pub fn body(&self, id: &str) -> Option<String> {
        self.sync.get_body(id)
    }

    /// Adds a document with a fresh random id. The body, if any, goes to the
    /// body tiers first; `has_body` records whether that worked.
    ///
    /// With [`WriteOutcome::NotPersisted`] the record only reached this tab's
    /// subscribers and later reads will not find it. The body is kept so the
    /// view built from that notification can still open it.
    pub fn add(&self, new: NewDocument) -> PortalResult<AddedDocument> {
        validate_fields(&new.title, &new.description, &new.category)?;

        let id = Uuid::new_v4().to_string();
        let has_body = match new.body.as_deref() {
            Some(body) => self.sync.store_body(&id, body),
            None => false,
        };
        let document = Document {
            id: id.clone(),
            title: new.title.trim().to_string(),
            description: new.description.trim().to_string(),
            category: new.category,
            page_count: new.page_count,
            uploaded_on: Local::now().date_naive(),
            hidden: false,
            has_body,
        };

        let result = self.sync.update(DOCUMENTS_KEY, default_documents, |docs: &mut Vec<Document>| {
            docs.push(document.clone());
            Ok(())
        });
        let ((), outcome) = match result {
            Ok(done) => done,
            Err(e) => {
                self.sync.remove_body(&id);
                return Err(e);
            }
        };

        if !outcome.is_persisted() {
            warn!(
                "Document '{id}' was not stored (storage full); only same-tab subscribers saw it \
                 and its body stays cached for that view"
            );
        }
        info!("Added document '{}' ({id}), body stored: {has_body}", document.title);
        Ok(AddedDocument { document, outcome })
    }

    /// Validates and ingests an uploaded file.
    pub fn upload(&self, upload: DocumentUpload) -> PortalResult<AddedDocument> {
        self.add(upload.into_new_document()?)
    }

    pub fn edit(&self, id: &str, edit: DocumentEdit) -> PortalResult<Document> {
        CredentialGate::new(self.sync).require_admin("editing a document")?;
        validate_fields(&edit.title, &edit.description, &edit.category)?;

        self.replace(id, |doc| {
            doc.title = edit.title.trim().to_string();
            doc.description = edit.description.trim().to_string();
            doc.category = edit.category.clone();
        })
    }

    /// Flips `hidden` in place; the document keeps its position.
    pub fn toggle_hidden(&self, id: &str) -> PortalResult<Document> {
        CredentialGate::new(self.sync).require_admin("changing document visibility")?;
        let doc = self.replace(id, |doc| doc.hidden = !doc.hidden)?;
        info!("Document '{id}' is now {}", if doc.hidden { "hidden" } else { "visible" });
        Ok(doc)
    }

    /// Deletes the record and drops its body from both tiers.
    pub fn delete(&self, id: &str) -> PortalResult<Document> {
        CredentialGate::new(self.sync).require_admin("deleting a document")?;

        let (removed, _) = self.sync.update(DOCUMENTS_KEY, default_documents, |docs: &mut Vec<Document>| {
            let index = docs
                .iter()
                .position(|doc| doc.id == id)
                .ok_or_else(|| PortalError::NotFound(format!("document '{id}'")))?;
            Ok(docs.remove(index))
        })?;
        self.sync.remove_body(id);

        info!("Deleted document '{id}'");
        Ok(removed)
    }

    fn replace<F>(&self, id: &str, change: F) -> PortalResult<Document>
    where
        F: Fn(&mut Document),
    {
        let (updated, _) = self.sync.update(DOCUMENTS_KEY, default_documents, |docs: &mut Vec<Document>| {
            let doc = docs
                .iter_mut()
                .find(|doc| doc.id == id)
                .ok_or_else(|| PortalError::NotFound(format!("document '{id}'")))?;
            change(doc);
            Ok(doc.clone())
        })?;
        Ok(updated)
    }
}

fn validate_fields(title: &str, description: &str, category: &str) -> PortalResult<()> {
    let missing: Vec<&str> = [("title", title), ("description", description), ("category", category)]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PortalError::validation(format!(
            "missing required field(s): {}",
            missing.join(", ")
        )))
    }
}
