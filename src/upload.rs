//! Ingestion of uploaded PDF files.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::collections::NewDocument;
use crate::error::{PortalError, PortalResult};

pub const PDF_MIME: &str = "application/pdf";
const DATA_URL_PREFIX: &str = "data:application/pdf;base64,";

#[derive(Debug, Clone, Default)]
pub struct DocumentUpload {
    pub title: String,
    pub description: String,
    pub category: String,
    pub file_name: String,
    /// MIME type reported by the host, when it has one.
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    /// Accepts a declared `application/pdf` type, or the `%PDF-` signature
    /// when the host did not report a type.
    pub fn is_pdf(&self) -> bool {
        match self.mime_type.as_deref() {
            Some(mime) => mime.eq_ignore_ascii_case(PDF_MIME),
            None => self.bytes.starts_with(b"%PDF-"),
        }
    }

    pub fn validate(&self) -> PortalResult<()> {
        if self.bytes.is_empty() {
            return Err(PortalError::validation("please select a PDF to upload"));
        }
        if !self.is_pdf() {
            return Err(PortalError::validation(format!(
                "'{}' is not a PDF file",
                self.file_name
            )));
        }
        Ok(())
    }

    /// The file as a `data:` URL, the form bodies are stored in.
    pub fn data_url(&self) -> String {
        encode_data_url(&self.bytes)
    }

    pub fn into_new_document(self) -> PortalResult<NewDocument> {
        self.validate()?;
        Ok(NewDocument {
            page_count: estimate_page_count(&self.bytes),
            body: Some(self.data_url()),
            title: self.title,
            description: self.description,
            category: self.category,
        })
    }
}

pub fn encode_data_url(bytes: &[u8]) -> String {
    format!("{DATA_URL_PREFIX}{}", STANDARD.encode(bytes))
}

/// Decodes a body produced by [`encode_data_url`].
pub fn decode_data_url(body: &str) -> PortalResult<Vec<u8>> {
    let payload = body
        .strip_prefix(DATA_URL_PREFIX)
        .ok_or_else(|| PortalError::validation("body is not a base64 PDF data URL"))?;
    STANDARD
        .decode(payload)
        .map_err(|e| PortalError::validation(format!("body is not valid base64: {e}")))
}

/// Counts page objects (`/Type /Page`, not `/Type /Pages`). Compressed
/// object streams hide them, so this can undercount; it never fails.
pub fn estimate_page_count(bytes: &[u8]) -> u32 {
    let mut pages = 0;
    let mut rest = bytes;
    while let Some(pos) = find(rest, b"/Type") {
        rest = &rest[pos + b"/Type".len()..];
        let after_ws = rest
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .map_or(&[][..], |skip| &rest[skip..]);
        if after_ws.starts_with(b"/Page") && !after_ws[b"/Page".len()..].starts_with(b"s") {
            pages += 1;
        }
    }
    pages
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
