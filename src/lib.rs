//! pageturn: a text indexing and navigation engine for long-form reading.
//!
//! The crate turns a raw document into the indexes a reading UI needs —
//! chapter boundaries, line offsets or fixed-size pages — and keeps the
//! reader's place in it: debounced progress persistence, restore on reopen,
//! bookmarks, and a background auto-scroll ticker. It is UI-agnostic: the
//! host feeds in scroll and page events, drains `session::Effect`s, and
//! implements the storage traits in [`store`] (or uses the file-backed
//! [`cache::FileStore`]).
//!
//! The usual entry point is [`session::ReaderSession::open`].

pub mod autoscroll;
pub mod bookmarks;
pub mod cache;
pub mod cancellation;
pub mod chapter;
pub mod document;
pub mod line_index;
pub mod logging;
pub mod mapper;
pub mod pagination;
pub mod progress;
pub mod session;
pub mod settings;
pub mod store;

pub use document::{Chapter, Document, LineIndex, Page, Position};
pub use mapper::{LayoutIndex, PositionMap, ResolvedPosition};
pub use session::{Effect, ReaderSession};
pub use settings::ReaderSettings;
