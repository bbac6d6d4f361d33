//! User-created position markers.
//!
//! A bookmark snapshots the chapter title at creation time — it is a
//! historical label, not a live pointer, so later re-detection or edits to
//! the chapter table never rewrite it. Jumping back resolves the stored
//! offset through the current mapper.

use crate::mapper::{PositionMap, ResolvedPosition};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: u64,
    pub char_offset: usize,
    /// Chapter title captured when the bookmark was created; never refreshed.
    pub chapter_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Unix seconds; strictly increasing across a store for display ordering.
    pub created_at: u64,
}

/// In-memory bookmark collection for one open document. Loading from and
/// writing through a `BookmarkBackend` is the session's job.
#[derive(Debug)]
pub struct BookmarkStore {
    bookmarks: Vec<Bookmark>,
    next_id: u64,
    last_created_at: u64,
}

impl Default for BookmarkStore {
    fn default() -> Self {
        Self::from_existing(Vec::new())
    }
}

impl BookmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate from persisted bookmarks, seeding the id and timestamp
    /// counters past everything already present.
    pub fn from_existing(mut bookmarks: Vec<Bookmark>) -> Self {
        bookmarks.sort_by_key(|b| b.created_at);
        let next_id = bookmarks.iter().map(|b| b.id + 1).max().unwrap_or(1);
        let last_created_at = bookmarks.last().map(|b| b.created_at).unwrap_or(0);
        Self {
            bookmarks,
            next_id,
            last_created_at,
        }
    }

    /// Create a bookmark at `char_offset`, snapshotting the chapter title
    /// through the mapper.
    pub fn create(
        &mut self,
        char_offset: usize,
        map: &PositionMap<'_>,
        note: Option<String>,
    ) -> Bookmark {
        let chapter_index = map.chapter_at(char_offset);
        let chapter_title = map.chapters()[chapter_index].title.clone();

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        // Same-second creations still order deterministically.
        let created_at = now.max(self.last_created_at + 1);
        self.last_created_at = created_at;

        let id = self.next_id;
        self.next_id += 1;

        info!(id, char_offset, chapter = %chapter_title, "Bookmark created");
        let bookmark = Bookmark {
            id,
            char_offset,
            chapter_title,
            note,
            created_at,
        };
        self.bookmarks.push(bookmark.clone());
        bookmark
    }

    /// Bookmarks in display order (creation time ascending).
    pub fn list(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn get(&self, id: u64) -> Option<&Bookmark> {
        self.bookmarks.iter().find(|b| b.id == id)
    }

    pub fn delete(&mut self, id: u64) -> bool {
        let before = self.bookmarks.len();
        self.bookmarks.retain(|b| b.id != id);
        let deleted = self.bookmarks.len() != before;
        if deleted {
            debug!(id, "Bookmark deleted");
        }
        deleted
    }

    /// Resolve a bookmark back into every coordinate the host can jump to.
    pub fn jump_target(&self, id: u64, map: &PositionMap<'_>) -> Option<ResolvedPosition> {
        self.get(id).map(|b| map.resolve(b.char_offset))
    }
}
