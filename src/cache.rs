//! File-backed default collaborators.
//!
//! Hosts with their own storage implement the `store` traits directly; for
//! everyone else this module keeps per-book state under `.cache/` using a
//! hash of the book id as the directory name to avoid filesystem issues.
//! Progress and per-book settings are tiny TOML files; bookmarks are one JSON
//! list. Write errors are logged and ignored — persistence must never stall
//! reading.

use crate::bookmarks::Bookmark;
use crate::progress::ProgressRecord;
use crate::settings::ReaderSettings;
use crate::store::{BookmarkBackend, ProgressStore};
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CACHE_DIR: &str = ".cache";

const PROGRESS_FILE: &str = "progress.toml";
const SETTINGS_FILE: &str = "settings.toml";
const BOOKMARKS_FILE: &str = "bookmarks.json";

/// Implements `ProgressStore` and `BookmarkBackend` over a cache directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DIR)
    }
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory for one book: `<root>/<sha256(book id)>`.
    pub fn book_dir(&self, book_id: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(book_id.as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        self.root.join(hash)
    }

    /// Per-book settings overrides, if any were saved.
    pub fn load_book_settings(&self, book_id: &str) -> Option<ReaderSettings> {
        let data = fs::read_to_string(self.book_dir(book_id).join(SETTINGS_FILE)).ok()?;
        toml::from_str(&data).ok()
    }

    /// Persist per-book settings overrides. Errors are ignored.
    pub fn save_book_settings(&self, book_id: &str, settings: &ReaderSettings) {
        let path = self.book_dir(book_id).join(SETTINGS_FILE);
        if let Ok(contents) = toml::to_string(settings) {
            let _ = write_file(&path, contents.as_bytes());
        }
    }
}

impl ProgressStore for FileStore {
    fn save(&self, book_id: &str, record: &ProgressRecord) -> Result<()> {
        let path = self.book_dir(book_id).join(PROGRESS_FILE);
        let contents = toml::to_string(record).context("Serializing progress record")?;
        write_file(&path, contents.as_bytes())
    }

    fn load(&self, book_id: &str) -> Result<Option<String>> {
        let path = self.book_dir(book_id).join(PROGRESS_FILE);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(_) => return Ok(None),
        };
        let record: ProgressRecord = toml::from_str(&data)
            .with_context(|| format!("Invalid progress file {}", path.display()))?;
        Ok(Some(record.position))
    }
}

impl BookmarkBackend for FileStore {
    fn list(&self, book_id: &str) -> Result<Vec<Bookmark>> {
        let path = self.book_dir(book_id).join(BOOKMARKS_FILE);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(_) => return Ok(Vec::new()),
        };
        serde_json::from_str(&data)
            .with_context(|| format!("Invalid bookmarks file {}", path.display()))
    }

    fn create(&self, book_id: &str, bookmark: &Bookmark) -> Result<()> {
        let mut bookmarks = self.list(book_id)?;
        bookmarks.retain(|b| b.id != bookmark.id);
        bookmarks.push(bookmark.clone());
        bookmarks.sort_by_key(|b| b.created_at);
        self.write_bookmarks(book_id, &bookmarks)
    }

    fn delete(&self, book_id: &str, bookmark_id: u64) -> Result<()> {
        let mut bookmarks = self.list(book_id)?;
        bookmarks.retain(|b| b.id != bookmark_id);
        self.write_bookmarks(book_id, &bookmarks)
    }
}

impl FileStore {
    fn write_bookmarks(&self, book_id: &str, bookmarks: &[Bookmark]) -> Result<()> {
        let path = self.book_dir(book_id).join(BOOKMARKS_FILE);
        let contents = serde_json::to_vec_pretty(bookmarks).context("Serializing bookmarks")?;
        write_file(&path, &contents)
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Creating cache dir {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Writing {}", path.display()))
}
