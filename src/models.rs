//! Records stored in the portal collections, their storage keys and the
//! seed data written on first start.
//!
//! Field names on the wire follow the keys the portal front end has always
//! used (`pages`, `uploadDate`, `hasContent`), so existing browser data
//! deserializes unchanged.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DOCUMENTS_KEY: &str = "pdfDocuments";
pub const PROGRAMS_KEY: &str = "academicPrograms";
pub const COMMENTS_KEY: &str = "pdfComments";
pub const LIKES_KEY: &str = "pdfLikes";
pub const VIEWER_ID_KEY: &str = "viewerId";
pub const VIEWER_NAME_KEY: &str = "viewerName";
pub const SESSION_FLAG_KEY: &str = "adminLoggedIn";
pub const SESSION_TOKEN_KEY: &str = "adminToken";
/// Same-tab notification fired on login and logout.
pub const SESSION_EVENT_KEY: &str = "adminSession";

const BODY_KEY_PREFIX: &str = "pdf-content-";

pub fn body_key(document_id: &str) -> String {
    format!("{BODY_KEY_PREFIX}{document_id}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Program id. May point at a program that no longer exists.
    pub category: String,
    #[serde(rename = "pages", default)]
    pub page_count: u32,
    #[serde(rename = "uploadDate")]
    pub uploaded_on: NaiveDate,
    #[serde(default)]
    pub hidden: bool,
    /// Whether the body was stored when the document was added. The body may
    /// have been lost since.
    #[serde(rename = "hasContent", default)]
    pub has_body: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: String,
    pub name: String,
}

impl Program {
    /// Lower-cases `name` and drops all whitespace. Punctuation is kept.
    pub fn slug(name: &str) -> String {
        name.chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect()
    }

    pub fn from_name(name: &str) -> Self {
        Self {
            id: Self::slug(name),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub document_id: String,
    /// Viewer id of the author. Empty for comments written before viewer ids
    /// existed; those can only be changed by an admin.
    #[serde(default)]
    pub author_id: String,
    #[serde(alias = "userName")]
    pub author_name: String,
    pub text: String,
    #[serde(alias = "timestamp")]
    pub posted_at: String,
}

/// Per-document like aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRecord {
    pub count: usize,
    #[serde(default)]
    pub liked_by: BTreeSet<String>,
}

impl LikeRecord {
    /// Re-derives `count` from `liked_by`.
    pub fn normalized(mut self) -> Self {
        self.count = self.liked_by.len();
        self
    }
}

pub type CommentMap = BTreeMap<String, Vec<Comment>>;
pub type LikeMap = BTreeMap<String, LikeRecord>;

/// Who is acting on a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub viewer_id: String,
    pub is_admin: bool,
}

impl Actor {
    pub fn may_modify(&self, comment: &Comment) -> bool {
        self.is_admin || (!comment.author_id.is_empty() && comment.author_id == self.viewer_id)
    }
}

pub fn default_programs() -> Vec<Program> {
    [("bsc", "BSc"), ("bsccsit", "BScCSIT"), ("bca", "BCA"), ("bbs", "BBS")]
        .into_iter()
        .map(|(id, name)| Program {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect()
}

pub fn default_documents() -> Vec<Document> {
    let seed = |id: &str, title: &str, description: &str, category: &str, pages, date: (i32, u32, u32)| {
        Document {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            page_count: pages,
            uploaded_on: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap_or_default(),
            hidden: false,
            has_body: false,
        }
    };
    vec![
        seed(
            "1",
            "Introduction to Computer Science",
            "Fundamentals of programming and computer systems",
            "bsccsit",
            42,
            (2023, 10, 15),
        ),
        seed(
            "2",
            "Biology 101: Cell Structure",
            "Comprehensive guide to cell biology and functions",
            "bsc",
            28,
            (2023, 11, 5),
        ),
    ]
}
