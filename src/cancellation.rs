//! Cooperative cancellation for tickers and background parses.

use anyhow::{Result, anyhow};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Cloneable flag observed by worker loops. Cancelling is idempotent and
/// visible to every clone.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Bail out of a multi-stage task, naming the stage that observed the
    /// cancellation.
    pub fn ensure_active(&self, stage: &'static str) -> Result<()> {
        if self.is_cancelled() {
            return Err(anyhow!("cancelled at stage={stage}"));
        }
        Ok(())
    }
}
