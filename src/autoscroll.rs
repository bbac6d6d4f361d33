//! Auto-scroll: a cancellable ticker that nudges the host's scroll position.
//!
//! Speed is a pixel-rate proxy, intentionally layout-dependent: the engine
//! has no idea how tall a line renders, so it hands the host a per-tick pixel
//! delta and lets the host apply it. The ticker runs on its own thread; at
//! most one is alive per controller, and starting (or changing speed) always
//! cancels the previous one first.

use crate::cancellation::CancellationToken;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

/// Tick period of the scroll loop.
pub const TICK_PERIOD: Duration = Duration::from_millis(50);
pub const MIN_SPEED_LEVEL: u8 = 1;
pub const MAX_SPEED_LEVEL: u8 = 10;

/// Pixel-equivalents to advance per tick at a given speed level.
pub fn step_px(speed_level: u8) -> f32 {
    let level = speed_level.clamp(MIN_SPEED_LEVEL, MAX_SPEED_LEVEL);
    0.5 + (level - 1) as f32 * 0.5
}

/// The host's answer to an advance request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAdvance {
    Applied,
    /// The maximum scroll extent has been reached; the controller stops.
    AtEnd,
}

/// Scroll surface supplied by the host. `reached_end` is raised exactly once
/// per run, after which the controller has already stopped itself.
pub trait AutoScrollHost: Send + Sync {
    fn advance_by(&self, delta_px: f32) -> ScrollAdvance;
    fn reached_end(&self);
}

struct ActiveScroll {
    token: CancellationToken,
    handle: JoinHandle<()>,
    host: Arc<dyn AutoScrollHost>,
    speed_level: u8,
}

#[derive(Default)]
pub struct AutoScrollController {
    active: Option<ActiveScroll>,
}

impl AutoScrollController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin ticking at the given speed, cancelling any previous run.
    pub fn start(&mut self, speed_level: u8, host: Arc<dyn AutoScrollHost>) {
        self.stop();
        let speed_level = speed_level.clamp(MIN_SPEED_LEVEL, MAX_SPEED_LEVEL);
        let token = CancellationToken::new();
        let ticker_token = token.clone();
        let ticker_host = Arc::clone(&host);
        let handle = thread::spawn(move || run_ticker(speed_level, ticker_host, ticker_token));
        info!(speed_level, "Auto-scroll started");
        self.active = Some(ActiveScroll {
            token,
            handle,
            host,
            speed_level,
        });
    }

    /// Change speed while running: cancel and restart, no interpolation.
    pub fn set_speed(&mut self, speed_level: u8) {
        let Some(active) = self.active.take() else {
            return;
        };
        if active.handle.is_finished() {
            // The run already ended at the boundary; a speed change must not
            // revive it and raise a second reached-end notification.
            debug!(speed_level, "Speed change ignored; auto-scroll already stopped");
            Self::shut_down(active);
            return;
        }
        if active.speed_level == speed_level.clamp(MIN_SPEED_LEVEL, MAX_SPEED_LEVEL) {
            self.active = Some(active);
            return;
        }
        let host = Arc::clone(&active.host);
        Self::shut_down(active);
        self.start(speed_level, host);
    }

    /// Cancel the ticker and wait for it to exit. Idempotent.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(speed_level = active.speed_level, "Auto-scroll stopped");
            Self::shut_down(active);
        }
    }

    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .map(|active| !active.handle.is_finished())
            .unwrap_or(false)
    }

    fn shut_down(active: ActiveScroll) {
        active.token.cancel();
        let _ = active.handle.join();
    }
}

impl Drop for AutoScrollController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_ticker(speed_level: u8, host: Arc<dyn AutoScrollHost>, token: CancellationToken) {
    let delta_px = step_px(speed_level);
    loop {
        if token.is_cancelled() {
            return;
        }
        match host.advance_by(delta_px) {
            ScrollAdvance::Applied => {}
            ScrollAdvance::AtEnd => {
                info!(speed_level, "Auto-scroll reached the end of the document");
                host.reached_end();
                return;
            }
        }
        thread::sleep(TICK_PERIOD);
    }
}
