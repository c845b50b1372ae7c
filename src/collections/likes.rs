use log::debug;

use crate::error::PortalResult;
use crate::models::{LikeMap, LikeRecord, LIKES_KEY};
use crate::sync::Persistence;

pub struct Likes<'a> {
    sync: &'a Persistence,
}

impl<'a> Likes<'a> {
    pub(crate) fn new(sync: &'a Persistence) -> Self {
        Self { sync }
    }

    /// The aggregate for `document_id`, with `count` re-derived from the
    /// set of viewers.
    pub fn get(&self, document_id: &str) -> LikeRecord {
        self.sync
            .read::<LikeMap>(LIKES_KEY)
            .and_then(|mut map| map.remove(document_id))
            .unwrap_or_default()
            .normalized()
    }

    pub fn has_liked(&self, document_id: &str, viewer_id: &str) -> bool {
        self.get(document_id).liked_by.contains(viewer_id)
    }

    /// Adds the viewer's like, or removes it if already present.
    pub fn toggle(&self, document_id: &str, viewer_id: &str) -> PortalResult<LikeRecord> {
        let (record, _) = self.sync.update(LIKES_KEY, LikeMap::new, |map: &mut LikeMap| {
            let record = map.entry(document_id.to_string()).or_default();
            if !record.liked_by.remove(viewer_id) {
                record.liked_by.insert(viewer_id.to_string());
            }
            record.count = record.liked_by.len();
            Ok(record.clone())
        })?;

        debug!("Document '{document_id}' now has {} like(s)", record.count);
        Ok(record)
    }
}
