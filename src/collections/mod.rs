//! Read-modify-write helpers over the portal collections.
//!
//! Each helper borrows a tab's [`Persistence`](crate::sync::Persistence),
//! loads the whole collection (falling back to its seed), applies one change
//! and writes the collection back.

mod comments;
mod documents;
mod likes;
mod programs;
mod viewer;

pub use comments::Comments;
pub use documents::{
    AddedDocument, DocumentEdit, DocumentFilter, Documents, NewDocument, UNCATEGORIZED,
};
pub use likes::Likes;
pub use programs::Programs;
pub use viewer::Viewer;
