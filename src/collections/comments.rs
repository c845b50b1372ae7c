use chrono::{Local, Utc};
use log::info;

use crate::error::{PortalError, PortalResult};
use crate::models::{Actor, Comment, CommentMap, COMMENTS_KEY};
use crate::sync::Persistence;

use super::Viewer;

/// Reader comments, grouped per document.
pub struct Comments<'a> {
    sync: &'a Persistence,
}

impl<'a> Comments<'a> {
    pub(crate) fn new(sync: &'a Persistence) -> Self {
        Self { sync }
    }

    pub fn list(&self, document_id: &str) -> Vec<Comment> {
        self.all().remove(document_id).unwrap_or_default()
    }

    pub fn all(&self) -> CommentMap {
        self.sync.read(COMMENTS_KEY).unwrap_or_default()
    }

    /// Posts a comment as this tab's viewer and remembers `author_name`.
    pub fn add(&self, document_id: &str, author_name: &str, text: &str) -> PortalResult<Comment> {
        let author_name = author_name.trim();
        let text = text.trim();
        if author_name.is_empty() {
            return Err(PortalError::validation("a name is required to comment"));
        }
        if text.is_empty() {
            return Err(PortalError::validation("comment text cannot be empty"));
        }

        let viewer = Viewer::new(self.sync);
        let author_id = viewer.id();
        let posted_at = Local::now().format("%-m/%-d/%Y, %-I:%M:%S %p").to_string();

        let (comment, _) = self.sync.update(COMMENTS_KEY, CommentMap::new, |map: &mut CommentMap| {
            let thread = map.entry(document_id.to_string()).or_default();
            let comment = Comment {
                id: next_comment_id(thread),
                document_id: document_id.to_string(),
                author_id: author_id.clone(),
                author_name: author_name.to_string(),
                text: text.to_string(),
                posted_at: posted_at.clone(),
            };
            thread.push(comment.clone());
            Ok(comment)
        })?;
        viewer.set_name(author_name);

        info!("Comment {} added to document '{document_id}'", comment.id);
        Ok(comment)
    }

    pub fn edit(
        &self,
        document_id: &str,
        comment_id: &str,
        text: &str,
        actor: &Actor,
    ) -> PortalResult<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PortalError::validation("comment text cannot be empty"));
        }

        let (edited, _) = self.sync.update(COMMENTS_KEY, CommentMap::new, |map: &mut CommentMap| {
            let comment = map
                .get_mut(document_id)
                .and_then(|thread| thread.iter_mut().find(|c| c.id == comment_id))
                .ok_or_else(|| not_found(document_id, comment_id))?;
            if !actor.may_modify(comment) {
                return Err(PortalError::Forbidden(
                    "only the author or an admin can edit this comment".to_string(),
                ));
            }
            comment.text = text.to_string();
            Ok(comment.clone())
        })?;

        info!("Comment {comment_id} on '{document_id}' edited by {}", actor.viewer_id);
        Ok(edited)
    }

    pub fn delete(&self, document_id: &str, comment_id: &str, actor: &Actor) -> PortalResult<Comment> {
        let (removed, _) = self.sync.update(COMMENTS_KEY, CommentMap::new, |map: &mut CommentMap| {
            let thread = map
                .get_mut(document_id)
                .ok_or_else(|| not_found(document_id, comment_id))?;
            let index = thread
                .iter()
                .position(|c| c.id == comment_id)
                .ok_or_else(|| not_found(document_id, comment_id))?;
            if !actor.may_modify(&thread[index]) {
                return Err(PortalError::Forbidden(
                    "only the author or an admin can delete this comment".to_string(),
                ));
            }
            Ok(thread.remove(index))
        })?;

        info!("Comment {comment_id} on '{document_id}' deleted by {}", actor.viewer_id);
        Ok(removed)
    }
}

/// Millisecond timestamp, bumped past any id already used in the thread.
fn next_comment_id(thread: &[Comment]) -> String {
    let mut candidate = Utc::now().timestamp_millis();
    while thread.iter().any(|c| c.id == candidate.to_string()) {
        candidate += 1;
    }
    candidate.to_string()
}

fn not_found(document_id: &str, comment_id: &str) -> PortalError {
    PortalError::NotFound(format!("comment '{comment_id}' on document '{document_id}'"))
}
