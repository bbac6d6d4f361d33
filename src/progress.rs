//! Progress tracking: debounced persistence and restore-with-confirmation.
//!
//! The tracker owns the reader's current position and decides *when* it is
//! persisted; *how* it is persisted belongs to the host's `ProgressStore`.
//! Timing is driven by explicit `Instant`s handed in by the caller, so the
//! debounce and the restore retry are plain state transitions that tests can
//! exercise without real timers.

use crate::document::Position;
use crate::mapper::estimate_scroll_fraction;
use crate::store::ProgressStore;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Quiet period before an in-memory position change is flushed.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_secs(2);
/// Delay before re-issuing a restore jump the host could not perform yet.
pub const RESTORE_RETRY_DELAY: Duration = Duration::from_millis(200);
/// Fraction at or above which a book counts as finished.
pub const FINISHED_FRACTION: f32 = 0.99;

/// What gets handed to the `ProgressStore`. The position crosses this
/// boundary as a decimal string for forward compatibility with legacy
/// non-numeric values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub progress: f32,
    pub position: String,
    pub finished: bool,
}

/// Outcome of inspecting the saved position at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreDecision {
    /// Ask the reader whether to resume at this offset or start over.
    Prompt { char_offset: usize },
    /// Resume silently: the saved position was clamped into a finished book,
    /// so there is nothing to confirm.
    Jump { char_offset: usize },
    /// Nothing usable was saved; start at the beginning.
    None,
}

/// Work the tracker wants done, surfaced from `poll`.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Save(ProgressRecord),
    RetryJump { char_offset: usize },
}

#[derive(Debug)]
pub struct ProgressTracker {
    doc_len: usize,
    position: Position,
    dirty_at: Option<Instant>,
    restore_evaluated: bool,
    prompt_offset: Option<usize>,
    pending_jump: Option<usize>,
    jump_retry_at: Option<Instant>,
}

impl ProgressTracker {
    pub fn new(doc_len: usize) -> Self {
        Self {
            doc_len,
            position: Position::default(),
            dirty_at: None,
            restore_evaluated: false,
            prompt_offset: None,
            pending_jump: None,
            jump_retry_at: None,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Inspect the stored prior position once per document load.
    ///
    /// A stale offset (document shrank since the save) is clamped into
    /// `[0, len)` rather than failing; a clamp down to 0 and a clamp into the
    /// finished tail both skip the confirmation dialog.
    pub fn evaluate_restore(&mut self, saved_position: Option<&str>) -> RestoreDecision {
        if self.restore_evaluated {
            return RestoreDecision::None;
        }
        self.restore_evaluated = true;

        let Some(saved) = saved_position.and_then(|s| s.trim().parse::<usize>().ok()) else {
            return RestoreDecision::None;
        };
        if self.doc_len == 0 || saved == 0 {
            return RestoreDecision::None;
        }

        let char_offset = saved.min(self.doc_len - 1);
        if char_offset == 0 {
            debug!(saved, "Saved position clamps to 0; not prompting");
            return RestoreDecision::None;
        }
        if char_offset != saved {
            info!(saved, clamped = char_offset, "Clamped stale saved position");
        }

        if estimate_scroll_fraction(char_offset, self.doc_len) >= FINISHED_FRACTION {
            // A finished book resumes at its tail without a dialog.
            self.pending_jump = Some(char_offset);
            return RestoreDecision::Jump { char_offset };
        }

        self.prompt_offset = Some(char_offset);
        RestoreDecision::Prompt { char_offset }
    }

    /// Apply the reader's answer to the restore prompt. Returns the jump
    /// target when they chose to resume.
    pub fn confirm_restore(&mut self, resume: bool) -> Option<usize> {
        let char_offset = self.prompt_offset.take()?;
        if !resume {
            info!("Reader declined restore; starting at the beginning");
            return None;
        }
        info!(char_offset, "Resuming at saved position");
        self.pending_jump = Some(char_offset);
        Some(char_offset)
    }

    /// The host had no scrollable surface yet; try the jump again shortly.
    pub fn jump_deferred(&mut self, now: Instant) {
        if self.pending_jump.is_some() {
            self.jump_retry_at = Some(now + RESTORE_RETRY_DELAY);
        }
    }

    pub fn jump_completed(&mut self) {
        self.pending_jump = None;
        self.jump_retry_at = None;
    }

    /// Record a position-changing event and re-arm the debounce window.
    pub fn note_position(&mut self, char_offset: usize, fraction: f32, now: Instant) {
        self.position = Position::clamped(char_offset, fraction, self.doc_len);
        self.dirty_at = Some(now);
    }

    /// Fire any timers that have elapsed by `now`.
    pub fn poll(&mut self, now: Instant) -> Vec<ProgressEvent> {
        let mut events = Vec::new();

        if let (Some(retry_at), Some(char_offset)) = (self.jump_retry_at, self.pending_jump) {
            if now >= retry_at {
                // Single-shot; the host defers again if it is still not ready.
                self.jump_retry_at = None;
                events.push(ProgressEvent::RetryJump { char_offset });
            }
        }

        if let Some(dirty_at) = self.dirty_at {
            if now.saturating_duration_since(dirty_at) >= DEBOUNCE_WINDOW {
                self.dirty_at = None;
                events.push(ProgressEvent::Save(self.record()));
            }
        }

        events
    }

    /// Flush immediately on lifecycle suspension, superseding the debounce.
    pub fn suspend(&mut self) -> Option<ProgressRecord> {
        self.dirty_at.take().map(|_| {
            debug!(offset = self.position.char_offset, "Flushing progress on suspension");
            self.record()
        })
    }

    fn record(&self) -> ProgressRecord {
        ProgressRecord {
            progress: self.position.fraction,
            position: self.position.char_offset.to_string(),
            finished: self.position.fraction >= FINISHED_FRACTION,
        }
    }
}

/// Hand a record to the store, logging and swallowing failures — persistence
/// must never interrupt reading, and the next natural trigger retries.
pub fn persist(store: &dyn ProgressStore, book_id: &str, record: &ProgressRecord) {
    match store.save(book_id, record) {
        Ok(()) => debug!(book_id, position = %record.position, "Saved reading progress"),
        Err(err) => warn!(book_id, "Progress save failed: {err:#}"),
    }
}
