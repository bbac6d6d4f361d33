//! Host collaborator contracts.
//!
//! The engine is a library, not a service: content, progress, and bookmarks
//! live wherever the host keeps them (HTTP, local files, a database). These
//! traits are the whole boundary; `cache` provides file-backed defaults.

use crate::bookmarks::Bookmark;
use crate::progress::ProgressRecord;
use anyhow::Result;

/// Raw material for one document load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookContent {
    pub title: String,
    pub content: String,
}

/// Supplies the raw text for a book id. Absence of content is a fatal load
/// error for that book; the engine creates no partial state.
pub trait ContentSource {
    fn fetch(&self, book_id: &str) -> Result<BookContent>;
}

/// Persists reading progress. Saves are fire-and-forget from the engine's
/// perspective; failures are logged and swallowed at the call site.
pub trait ProgressStore {
    fn save(&self, book_id: &str, record: &ProgressRecord) -> Result<()>;

    /// The previously saved position, as the decimal string the engine wrote.
    /// `None` when nothing was saved yet.
    fn load(&self, book_id: &str) -> Result<Option<String>>;
}

/// Persists user-created bookmarks.
pub trait BookmarkBackend {
    fn list(&self, book_id: &str) -> Result<Vec<Bookmark>>;
    fn create(&self, book_id: &str, bookmark: &Bookmark) -> Result<()>;
    fn delete(&self, book_id: &str, bookmark_id: u64) -> Result<()>;
}
