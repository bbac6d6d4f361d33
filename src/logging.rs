//! Tracing setup for hosts that want the engine's default logging.
//!
//! The subscriber installs an env-filter reload layer so the level can be
//! re-applied when the settings file changes, without restarting the host.

use crate::settings::LogLevel;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

pub type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

/// Install the default subscriber. Call once per process; the returned
/// handle feeds `apply_log_level`.
pub fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

/// Re-apply the verbosity from settings over the running subscriber.
pub fn apply_log_level(handle: &ReloadHandle, level: LogLevel) {
    let parsed = EnvFilter::builder()
        .parse(level.as_filter_str())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from settings: {err}");
    } else {
        info!(%level, "Applied log level from settings");
    }
}
