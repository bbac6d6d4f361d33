//! Per-document orchestration.
//!
//! One `ReaderSession` exists per open book. It owns the document snapshot,
//! the indexes (or the in-flight parse that will produce them), the progress
//! tracker, the bookmark collection, and the auto-scroll controller. Nothing
//! survives a document switch: dropping the session cancels its timers, and
//! the next book starts from scratch.
//!
//! Side effects the host must perform (show the restore dialog, scroll
//! somewhere, persist progress) are queued as `Effect`s and drained from
//! `poll`, so the engine itself never touches the UI or storage directly.

use crate::autoscroll::{AutoScrollController, AutoScrollHost};
use crate::bookmarks::{Bookmark, BookmarkStore};
use crate::cache::FileStore;
use crate::cancellation::CancellationToken;
use crate::chapter;
use crate::document::{Chapter, Document, Position};
use crate::line_index;
use crate::mapper::{LayoutIndex, PositionMap, ResolvedPosition, estimate_scroll_fraction};
use crate::pagination::{self, DEFAULT_PAGE_SIZE};
use crate::progress::{ProgressEvent, ProgressRecord, ProgressTracker, RestoreDecision};
use crate::settings::{LayoutMode, ReaderSettings, clamp_settings};
use crate::store::{BookmarkBackend, ContentSource, ProgressStore};
use anyhow::{Context, Result, bail};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Documents at or above this many characters parse on a worker thread.
pub const OFF_THREAD_PARSE_THRESHOLD: usize = 500_000;

/// The immutable per-document indexes.
#[derive(Debug, Clone)]
pub struct DocumentIndexes {
    pub chapters: Vec<Chapter>,
    pub layout: LayoutIndex,
}

/// Work the host must perform, drained from `ReaderSession::poll`.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Ask the reader whether to resume at this offset or start over.
    PromptRestore { char_offset: usize },
    /// Navigate the reading surface to this position.
    JumpTo(ResolvedPosition),
    /// Persist this progress record (e.g. via `progress::persist`).
    SaveProgress(ProgressRecord),
}

/// Chapter/line/page counts and the percent read, for status displays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReaderStats {
    pub chapter_count: usize,
    pub line_count: usize,
    pub page_count: usize,
    pub char_len: usize,
    pub percent_through: f32,
}

struct ParseOutcome {
    generation: u64,
    indexes: DocumentIndexes,
}

enum SessionState {
    /// A worker parse is in flight. Scroll targets that arrive meanwhile are
    /// collapsed into one pending target and replayed on completion.
    Parsing {
        rx: Receiver<ParseOutcome>,
        pending_target: Option<usize>,
    },
    Ready(DocumentIndexes),
}

pub struct ReaderSession {
    book_id: String,
    title: String,
    document: Document,
    settings: ReaderSettings,
    state: SessionState,
    generation: u64,
    progress: ProgressTracker,
    bookmarks: BookmarkStore,
    autoscroll: AutoScrollController,
    /// Cancels the in-flight worker parse when it is superseded or the
    /// session is torn down.
    parse_token: CancellationToken,
    /// Page start offsets from the last built page table, kept across a
    /// relayout so page turns arriving mid-parse still resolve to an offset.
    prior_page_offsets: Vec<usize>,
    /// Restore jump that was decided while the indexes were still building.
    deferred_jump: Option<usize>,
    effects: VecDeque<Effect>,
}

impl ReaderSession {
    /// Load a book and start building its indexes.
    ///
    /// `saved_position` is whatever the progress store returned for this book
    /// and `existing_bookmarks` its persisted bookmarks; pass `None`/empty
    /// when the host keeps no state. Content absence is a hard error: no
    /// partial session is created.
    pub fn open(
        book_id: impl Into<String>,
        source: &dyn ContentSource,
        mut settings: ReaderSettings,
        saved_position: Option<String>,
        existing_bookmarks: Vec<Bookmark>,
    ) -> Result<Self> {
        let book_id = book_id.into();
        let content = source
            .fetch(&book_id)
            .with_context(|| format!("Fetching content for {book_id}"))?;
        if content.content.is_empty() {
            bail!("Content source returned no usable text for {book_id}");
        }
        clamp_settings(&mut settings);

        let document = Document::new(content.content);
        let mut progress = ProgressTracker::new(document.char_len());
        let mut effects = VecDeque::new();
        let mut deferred_jump = None;

        match progress.evaluate_restore(saved_position.as_deref()) {
            RestoreDecision::Prompt { char_offset } => {
                effects.push_back(Effect::PromptRestore { char_offset });
            }
            RestoreDecision::Jump { char_offset } => {
                // Finished book: resume at its tail without a dialog.
                deferred_jump = Some(char_offset);
            }
            RestoreDecision::None => {}
        }

        let mut session = Self {
            title: content.title,
            document,
            settings,
            state: SessionState::Ready(DocumentIndexes {
                chapters: Vec::new(),
                layout: LayoutIndex::Pages(Vec::new()),
            }),
            generation: 0,
            progress,
            bookmarks: BookmarkStore::from_existing(existing_bookmarks),
            autoscroll: AutoScrollController::new(),
            parse_token: CancellationToken::new(),
            prior_page_offsets: Vec::new(),
            deferred_jump,
            effects,
            book_id,
        };
        session.start_parse(None);
        info!(
            book_id = %session.book_id,
            title = %session.title,
            chars = session.document.char_len(),
            layout = %session.settings.layout_mode,
            "Opened document"
        );
        Ok(session)
    }

    /// `open` wired to the file-backed cache: loads the saved position, the
    /// persisted bookmarks, and any per-book settings overrides, all
    /// non-fatally.
    pub fn open_with_store(
        book_id: impl Into<String>,
        source: &dyn ContentSource,
        store: &FileStore,
        base_settings: ReaderSettings,
    ) -> Result<Self> {
        let book_id = book_id.into();
        let settings = match store.load_book_settings(&book_id) {
            Some(overrides) => {
                info!(book_id = %book_id, "Loaded per-book settings overrides");
                overrides
            }
            None => base_settings,
        };
        let saved_position = match ProgressStore::load(store, &book_id) {
            Ok(position) => position,
            Err(err) => {
                warn!(book_id = %book_id, "Ignoring unreadable saved progress: {err:#}");
                None
            }
        };
        let bookmarks = match BookmarkBackend::list(store, &book_id) {
            Ok(bookmarks) => bookmarks,
            Err(err) => {
                warn!(book_id = %book_id, "Ignoring unreadable bookmarks: {err:#}");
                Vec::new()
            }
        };
        Self::open(book_id, source, settings, saved_position, bookmarks)
    }

    pub fn book_id(&self) -> &str {
        &self.book_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    pub fn is_parsing(&self) -> bool {
        matches!(self.state, SessionState::Parsing { .. })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready(_))
    }

    pub fn position(&self) -> Position {
        self.progress.position()
    }

    pub fn chapters(&self) -> Option<&[Chapter]> {
        match &self.state {
            SessionState::Ready(indexes) => Some(&indexes.chapters),
            SessionState::Parsing { .. } => None,
        }
    }

    /// Coordinate queries over the built indexes. `None` while parsing.
    pub fn map(&self) -> Option<PositionMap<'_>> {
        match &self.state {
            SessionState::Ready(indexes) => Some(PositionMap::new(
                &indexes.chapters,
                &indexes.layout,
                self.document.char_len(),
            )),
            SessionState::Parsing { .. } => None,
        }
    }

    pub fn stats(&self) -> Option<ReaderStats> {
        let SessionState::Ready(indexes) = &self.state else {
            return None;
        };
        let char_len = self.document.char_len();
        Some(ReaderStats {
            chapter_count: indexes.chapters.len(),
            line_count: indexes.layout.line_count(),
            page_count: indexes.layout.page_count(),
            char_len,
            percent_through: estimate_scroll_fraction(self.progress.position().char_offset, char_len)
                * 100.0,
        })
    }

    /// Drive timers and the in-flight parse; returns the effects the host
    /// must perform. Call periodically (the debounce and retry windows are
    /// coarse; anything around 50-250ms works).
    pub fn poll(&mut self, now: Instant) -> Vec<Effect> {
        self.pump_parse(now);

        for event in self.progress.poll(now) {
            match event {
                ProgressEvent::Save(record) => self.effects.push_back(Effect::SaveProgress(record)),
                ProgressEvent::RetryJump { char_offset } => {
                    if let Some(resolved) = self.resolve(char_offset) {
                        self.effects.push_back(Effect::JumpTo(resolved));
                    }
                }
            }
        }

        self.effects.drain(..).collect()
    }

    /// Host-reported scroll/position event.
    ///
    /// While a parse is in flight the offset is buffered as the single
    /// pending target and replayed once the indexes land — never silently
    /// dropped, never applied against indexes that do not exist yet.
    pub fn position_changed(&mut self, char_offset: usize, fraction: f32, now: Instant) {
        match &mut self.state {
            SessionState::Parsing { pending_target, .. } => {
                debug!(char_offset, "Buffered position event during parse");
                *pending_target = Some(char_offset);
            }
            SessionState::Ready(_) => {
                self.progress.note_position(char_offset, fraction, now);
            }
        }
    }

    /// Host-reported page turn (paged layout).
    ///
    /// While a relayout parse is in flight the previous page table still
    /// gives the turn a usable character target, so it is buffered like a
    /// scroll event. Without any page table the event is ignored: a page
    /// index is meaningless before one exists.
    pub fn page_changed(&mut self, page_index: usize, now: Instant) {
        if let Some(char_offset) = self.map().and_then(|m| m.offset_for_page(page_index)) {
            let fraction = estimate_scroll_fraction(char_offset, self.document.char_len());
            self.progress.note_position(char_offset, fraction, now);
            return;
        }
        let prior = self.prior_page_offsets.get(page_index).copied();
        if let (SessionState::Parsing { pending_target, .. }, Some(char_offset)) =
            (&mut self.state, prior)
        {
            debug!(page_index, char_offset, "Buffered page event via the previous page table");
            *pending_target = Some(char_offset);
            return;
        }
        debug!(page_index, "Ignoring page event without a page table");
    }

    /// The reader answered the restore dialog.
    pub fn confirm_restore(&mut self, resume: bool) {
        let Some(char_offset) = self.progress.confirm_restore(resume) else {
            return;
        };
        match self.resolve(char_offset) {
            Some(resolved) => self.effects.push_back(Effect::JumpTo(resolved)),
            None => self.deferred_jump = Some(char_offset),
        }
    }

    /// The host could not perform the last jump yet (no surface attached).
    pub fn jump_deferred(&mut self, now: Instant) {
        self.progress.jump_deferred(now);
    }

    pub fn jump_completed(&mut self) {
        self.progress.jump_completed();
    }

    /// Flush progress immediately on lifecycle suspension.
    pub fn suspend(&mut self) -> Vec<Effect> {
        self.progress
            .suspend()
            .map(|record| vec![Effect::SaveProgress(record)])
            .unwrap_or_default()
    }

    /// Navigate to a chapter start.
    pub fn jump_to_chapter(&mut self, chapter_index: usize) -> bool {
        let Some(map) = self.map() else {
            return false;
        };
        let Some(char_offset) = map.offset_for_chapter_start(chapter_index) else {
            return false;
        };
        let resolved = map.resolve(char_offset);
        self.effects.push_back(Effect::JumpTo(resolved));
        true
    }

    /// Create a bookmark at the current position. `None` while parsing.
    pub fn create_bookmark(&mut self, note: Option<String>) -> Option<Bookmark> {
        let SessionState::Ready(indexes) = &self.state else {
            return None;
        };
        let map = PositionMap::new(&indexes.chapters, &indexes.layout, self.document.char_len());
        let char_offset = self.progress.position().char_offset;
        Some(self.bookmarks.create(char_offset, &map, note))
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        self.bookmarks.list()
    }

    pub fn delete_bookmark(&mut self, id: u64) -> bool {
        self.bookmarks.delete(id)
    }

    /// Queue a jump to a bookmark's stored offset.
    pub fn jump_to_bookmark(&mut self, id: u64) -> bool {
        let SessionState::Ready(indexes) = &self.state else {
            return false;
        };
        let map = PositionMap::new(&indexes.chapters, &indexes.layout, self.document.char_len());
        match self.bookmarks.jump_target(id, &map) {
            Some(resolved) => {
                self.effects.push_back(Effect::JumpTo(resolved));
                true
            }
            None => false,
        }
    }

    /// Apply new settings. A layout mode change rebuilds the indexes (through
    /// the same size-threshold path as the initial parse); a speed change is
    /// handed to a running auto-scroll ticker.
    pub fn apply_settings(&mut self, mut settings: ReaderSettings) {
        clamp_settings(&mut settings);
        let relayout = settings.layout_mode != self.settings.layout_mode;
        let speed_changed = settings.scroll_speed != self.settings.scroll_speed;
        self.settings = settings;

        if relayout {
            info!(layout = %self.settings.layout_mode, "Layout mode changed; rebuilding indexes");
            let pending = match &mut self.state {
                SessionState::Parsing { pending_target, .. } => pending_target.take(),
                SessionState::Ready(_) => None,
            };
            self.start_parse(pending);
        }
        if speed_changed {
            self.autoscroll.set_speed(self.settings.scroll_speed);
        }
    }

    /// Start auto-scroll at the configured speed against the host's surface.
    pub fn start_auto_scroll(&mut self, host: Arc<dyn AutoScrollHost>) {
        self.autoscroll.start(self.settings.scroll_speed, host);
    }

    pub fn stop_auto_scroll(&mut self) {
        self.autoscroll.stop();
    }

    pub fn auto_scroll_running(&self) -> bool {
        self.autoscroll.is_running()
    }

    fn resolve(&self, char_offset: usize) -> Option<ResolvedPosition> {
        self.map().map(|m| m.resolve(char_offset))
    }

    /// Build (or rebuild) the indexes, inline for small documents and on a
    /// worker thread past the size threshold. Any previous worker parse is
    /// cancelled; its result would be superseded anyway.
    fn start_parse(&mut self, pending_target: Option<usize>) {
        self.parse_token.cancel();
        self.parse_token = CancellationToken::new();
        self.generation += 1;
        let generation = self.generation;
        let layout_mode = self.settings.layout_mode;

        if self.document.char_len() < OFF_THREAD_PARSE_THRESHOLD {
            let indexes = build_indexes(self.document.text(), layout_mode);
            self.finish_parse(indexes, pending_target, Instant::now());
            return;
        }

        debug!(
            chars = self.document.char_len(),
            "Parsing on a worker thread"
        );
        let text = self.document.shared_text();
        let token = self.parse_token.clone();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            if let Some(indexes) = staged_parse(&text, layout_mode, &token) {
                // The session may have moved on; a dropped receiver is fine.
                let _ = tx.send(ParseOutcome {
                    generation,
                    indexes,
                });
            }
        });
        self.state = SessionState::Parsing { rx, pending_target };
    }

    fn pump_parse(&mut self, now: Instant) {
        let SessionState::Parsing { rx, pending_target } = &mut self.state else {
            return;
        };
        match rx.try_recv() {
            Ok(outcome) if outcome.generation == self.generation => {
                let pending = pending_target.take();
                self.finish_parse(outcome.indexes, pending, now);
            }
            Ok(outcome) => {
                debug!(
                    stale = outcome.generation,
                    current = self.generation,
                    "Discarded superseded parse result"
                );
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                // Worker died without delivering; rebuild inline so the
                // session still reaches Ready.
                warn!("Parse worker disconnected; rebuilding indexes inline");
                let pending = pending_target.take();
                let indexes = build_indexes(self.document.text(), self.settings.layout_mode);
                self.finish_parse(indexes, pending, now);
            }
        }
    }

    fn finish_parse(
        &mut self,
        indexes: DocumentIndexes,
        pending_target: Option<usize>,
        now: Instant,
    ) {
        info!(
            chapters = indexes.chapters.len(),
            lines = indexes.layout.line_count(),
            pages = indexes.layout.page_count(),
            "Document indexes built"
        );
        self.prior_page_offsets = match &indexes.layout {
            LayoutIndex::Pages(pages) => pages.iter().map(|p| p.start_offset).collect(),
            LayoutIndex::Lines(_) => Vec::new(),
        };
        self.state = SessionState::Ready(indexes);

        if let Some(char_offset) = pending_target {
            debug!(char_offset, "Replaying buffered position event");
            let fraction = estimate_scroll_fraction(char_offset, self.document.char_len());
            self.progress.note_position(char_offset, fraction, now);
        }
        if let Some(char_offset) = self.deferred_jump.take() {
            if let Some(resolved) = self.resolve(char_offset) {
                self.effects.push_back(Effect::JumpTo(resolved));
            }
        }
    }
}

impl Drop for ReaderSession {
    fn drop(&mut self) {
        self.parse_token.cancel();
    }
}

fn build_indexes(text: &str, layout_mode: LayoutMode) -> DocumentIndexes {
    DocumentIndexes {
        chapters: chapter::detect(text),
        layout: layout_for(text, layout_mode),
    }
}

/// Worker-side parse that bails out between stages once the session has
/// moved on, instead of indexing a superseded document to completion.
fn staged_parse(
    text: &str,
    layout_mode: LayoutMode,
    token: &CancellationToken,
) -> Option<DocumentIndexes> {
    token.ensure_active("chapters").ok()?;
    let chapters = chapter::detect(text);
    token.ensure_active("layout").ok()?;
    Some(DocumentIndexes {
        chapters,
        layout: layout_for(text, layout_mode),
    })
}

fn layout_for(text: &str, layout_mode: LayoutMode) -> LayoutIndex {
    match layout_mode {
        LayoutMode::Scroll => LayoutIndex::Lines(line_index::build_index(text)),
        LayoutMode::Paged => LayoutIndex::Pages(pagination::paginate(text, DEFAULT_PAGE_SIZE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::DEBOUNCE_WINDOW;
    use crate::store::BookContent;
    use std::time::Duration;

    struct StaticSource {
        title: &'static str,
        content: String,
    }

    impl StaticSource {
        fn new(content: impl Into<String>) -> Self {
            Self {
                title: "test book",
                content: content.into(),
            }
        }
    }

    impl ContentSource for StaticSource {
        fn fetch(&self, _book_id: &str) -> Result<BookContent> {
            Ok(BookContent {
                title: self.title.to_string(),
                content: self.content.clone(),
            })
        }
    }

    fn open_small(content: &str) -> ReaderSession {
        ReaderSession::open(
            "book-1",
            &StaticSource::new(content),
            ReaderSettings::default(),
            None,
            Vec::new(),
        )
        .unwrap()
    }

    fn wait_ready(session: &mut ReaderSession) -> Vec<Effect> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut effects = Vec::new();
        while !session.is_ready() {
            assert!(Instant::now() < deadline, "parse did not finish in time");
            effects.extend(session.poll(Instant::now()));
            thread::sleep(Duration::from_millis(5));
        }
        effects
    }

    #[test]
    fn empty_content_is_a_fatal_load_error() {
        let result = ReaderSession::open(
            "book-1",
            &StaticSource::new(""),
            ReaderSettings::default(),
            None,
            Vec::new(),
        );
        assert!(result.is_err(), "no partial session for empty content");
    }

    #[test]
    fn small_documents_are_ready_immediately() {
        let session = open_small("第一章 开始\n内容\n第二章 继续\n内容");
        assert!(session.is_ready());
        assert_eq!(session.chapters().unwrap().len(), 2);
        let stats = session.stats().unwrap();
        assert_eq!(stats.chapter_count, 2);
        assert!(stats.line_count > 0);
        assert_eq!(stats.page_count, 0, "scroll layout has no pages");
    }

    #[test]
    fn scroll_events_debounce_into_one_save_effect() {
        let mut session = open_small("第一章 开始\n内容内容内容内容");
        let start = Instant::now();
        session.position_changed(3, 0.2, start);
        session.position_changed(6, 0.5, start + Duration::from_millis(500));

        assert!(session.poll(start + Duration::from_secs(1)).is_empty());
        let effects = session.poll(start + Duration::from_millis(500) + DEBOUNCE_WINDOW);
        assert_eq!(effects.len(), 1);
        match &effects[0] {
            Effect::SaveProgress(record) => {
                assert_eq!(record.position, "6", "last update wins");
                assert!(!record.finished);
            }
            other => panic!("expected a save effect, got {other:?}"),
        }
    }

    #[test]
    fn saved_mid_book_position_prompts_and_resumes() {
        let text = format!("第一章 开始\n{}", "内容".repeat(200));
        let mut session = ReaderSession::open(
            "book-1",
            &StaticSource::new(text),
            ReaderSettings::default(),
            Some("100".to_string()),
            Vec::new(),
        )
        .unwrap();

        let effects = session.poll(Instant::now());
        assert!(
            effects.contains(&Effect::PromptRestore { char_offset: 100 }),
            "mid-book restore asks for confirmation"
        );

        session.confirm_restore(true);
        let effects = session.poll(Instant::now());
        match effects.as_slice() {
            [Effect::JumpTo(resolved)] => assert_eq!(resolved.char_offset, 100),
            other => panic!("expected one jump, got {other:?}"),
        }
    }

    #[test]
    fn stale_finished_position_jumps_without_a_prompt() {
        let text = "x".repeat(500);
        let mut session = ReaderSession::open(
            "book-1",
            &StaticSource::new(text),
            ReaderSettings::default(),
            Some("999999".to_string()),
            Vec::new(),
        )
        .unwrap();

        let effects = session.poll(Instant::now());
        assert!(
            !effects
                .iter()
                .any(|e| matches!(e, Effect::PromptRestore { .. })),
            "a finished book never prompts"
        );
        match effects.as_slice() {
            [Effect::JumpTo(resolved)] => assert_eq!(resolved.char_offset, 499),
            other => panic!("expected one clamped jump, got {other:?}"),
        }
    }

    #[test]
    fn deferred_jump_retries_through_poll() {
        let text = format!("第一章 开始\n{}", "内容".repeat(200));
        let mut session = ReaderSession::open(
            "book-1",
            &StaticSource::new(text),
            ReaderSettings::default(),
            Some("100".to_string()),
            Vec::new(),
        )
        .unwrap();
        session.poll(Instant::now());
        session.confirm_restore(true);
        session.poll(Instant::now());

        let now = Instant::now();
        session.jump_deferred(now);
        let effects = session.poll(now + crate::progress::RESTORE_RETRY_DELAY);
        match effects.as_slice() {
            [Effect::JumpTo(resolved)] => assert_eq!(resolved.char_offset, 100),
            other => panic!("expected a retried jump, got {other:?}"),
        }
        session.jump_completed();
    }

    #[test]
    fn large_documents_parse_off_thread_and_replay_buffered_events() {
        let mut heading = String::from("第一章 长篇\n");
        heading.push_str(&"字".repeat(OFF_THREAD_PARSE_THRESHOLD));
        let mut session = open_large(&heading);
        assert!(session.is_parsing(), "big document must parse off-thread");

        // A scroll event during the parse is buffered, not dropped.
        session.position_changed(1234, 0.01, Instant::now());
        wait_ready(&mut session);

        assert_eq!(
            session.position().char_offset,
            1234,
            "buffered target must be replayed once indexes are ready"
        );
        // ...and eventually persisted via the normal debounce path.
        let effects = session.poll(Instant::now() + DEBOUNCE_WINDOW + Duration::from_secs(1));
        assert!(
            effects
                .iter()
                .any(|e| matches!(e, Effect::SaveProgress(r) if r.position == "1234")),
            "replayed event must reach persistence"
        );
        assert!(session.chapters().unwrap().len() >= 1);
    }

    fn open_large(content: &str) -> ReaderSession {
        ReaderSession::open(
            "book-large",
            &StaticSource::new(content),
            ReaderSettings::default(),
            None,
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn a_superseded_parse_stops_between_stages() {
        let token = CancellationToken::new();
        assert!(
            staged_parse("第一章 开始\n正文", LayoutMode::Scroll, &token).is_some(),
            "an active token lets the parse run to completion"
        );
        token.cancel();
        assert!(
            staged_parse("第一章 开始\n正文", LayoutMode::Scroll, &token).is_none(),
            "a cancelled token stops the parse before it indexes"
        );
    }

    #[test]
    fn relayout_during_a_parse_carries_the_pending_target() {
        let text = "字".repeat(OFF_THREAD_PARSE_THRESHOLD);
        let mut session = open_large(&text);
        assert!(session.is_parsing());
        session.position_changed(777, 0.01, Instant::now());

        let mut settings = session.settings().clone();
        settings.layout_mode = LayoutMode::Paged;
        session.apply_settings(settings);
        assert!(session.is_parsing(), "relayout restarts the worker parse");

        wait_ready(&mut session);
        assert_eq!(
            session.position().char_offset,
            777,
            "the buffered target must survive the superseding parse"
        );
        assert!(session.stats().unwrap().page_count > 0);
    }

    #[test]
    fn page_turns_during_a_relayout_resolve_through_the_previous_table() {
        let settings = ReaderSettings {
            layout_mode: LayoutMode::Paged,
            ..ReaderSettings::default()
        };
        let text = "x".repeat(OFF_THREAD_PARSE_THRESHOLD);
        let mut session = ReaderSession::open(
            "book-large",
            &StaticSource::new(text),
            settings,
            None,
            Vec::new(),
        )
        .unwrap();
        wait_ready(&mut session);
        assert!(session.stats().unwrap().page_count > 2);

        let mut settings = session.settings().clone();
        settings.layout_mode = LayoutMode::Scroll;
        session.apply_settings(settings);
        assert!(session.is_parsing());

        session.page_changed(1, Instant::now());
        wait_ready(&mut session);
        assert_eq!(
            session.position().char_offset,
            2000,
            "the turn maps through the page table that existed when it fired"
        );
    }

    #[test]
    fn page_events_map_to_char_offsets_in_paged_layout() {
        let settings = ReaderSettings {
            layout_mode: LayoutMode::Paged,
            ..ReaderSettings::default()
        };
        let text = "x".repeat(4500);
        let mut session = ReaderSession::open(
            "book-1",
            &StaticSource::new(text),
            settings,
            None,
            Vec::new(),
        )
        .unwrap();
        assert_eq!(session.stats().unwrap().page_count, 3);

        session.page_changed(2, Instant::now());
        assert_eq!(session.position().char_offset, 4000);
    }

    #[test]
    fn suspension_flushes_without_waiting_for_the_debounce() {
        let mut session = open_small("第一章 开始\n内容内容内容");
        session.position_changed(5, 0.5, Instant::now());
        let effects = session.suspend();
        match effects.as_slice() {
            [Effect::SaveProgress(record)] => assert_eq!(record.position, "5"),
            other => panic!("expected an immediate save, got {other:?}"),
        }
        assert!(session.suspend().is_empty(), "nothing left to flush");
    }

    #[test]
    fn layout_change_rebuilds_indexes() {
        let mut session = open_small(&"一句话。".repeat(1200));
        assert!(session.stats().unwrap().page_count == 0);

        let mut settings = session.settings().clone();
        settings.layout_mode = LayoutMode::Paged;
        session.apply_settings(settings);
        let stats = session.stats().unwrap();
        assert!(stats.page_count > 1, "paged layout must produce pages");
        assert_eq!(stats.line_count, 0);
    }

    #[test]
    fn bookmarks_snapshot_and_jump_through_the_session() {
        let mut session = open_small("第一章 开端\n正文\n第二章 发展\n正文");
        let second_start = session.chapters().unwrap()[1].start_offset;
        session.position_changed(second_start + 1, 0.6, Instant::now());

        let bookmark = session.create_bookmark(None).unwrap();
        assert_eq!(bookmark.chapter_title, "第二章 发展");

        assert!(session.jump_to_bookmark(bookmark.id));
        let effects = session.poll(Instant::now());
        assert!(
            effects
                .iter()
                .any(|e| matches!(e, Effect::JumpTo(r) if r.char_offset == second_start + 1)),
        );

        assert!(session.delete_bookmark(bookmark.id));
        assert!(!session.jump_to_bookmark(bookmark.id));
    }

    #[test]
    fn chapter_jump_queues_navigation() {
        let mut session = open_small("第一章 开端\n正文\n第二章 发展\n正文");
        let second_start = session.chapters().unwrap()[1].start_offset;
        assert!(session.jump_to_chapter(1));
        assert!(!session.jump_to_chapter(99));
        let effects = session.poll(Instant::now());
        match effects.as_slice() {
            [Effect::JumpTo(resolved)] => {
                assert_eq!(resolved.char_offset, second_start);
                assert_eq!(resolved.chapter_index, 1);
            }
            other => panic!("expected one jump, got {other:?}"),
        }
    }

    #[test]
    fn open_with_store_round_trips_progress() {
        let store = FileStore::new(std::env::temp_dir().join(format!(
            "pageturn-session-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        )));
        let source = StaticSource::new(format!("第一章 开始\n{}", "内容".repeat(300)));

        let mut session =
            ReaderSession::open_with_store("book-1", &source, &store, ReaderSettings::default())
                .unwrap();
        let start = Instant::now();
        session.position_changed(250, 0.4, start);
        for effect in session.poll(start + DEBOUNCE_WINDOW) {
            if let Effect::SaveProgress(record) = effect {
                crate::progress::persist(&store, "book-1", &record);
            }
        }

        let mut reopened =
            ReaderSession::open_with_store("book-1", &source, &store, ReaderSettings::default())
                .unwrap();
        let effects = reopened.poll(Instant::now());
        assert!(
            effects.contains(&Effect::PromptRestore { char_offset: 250 }),
            "saved progress must prompt on the next open"
        );
    }
}
