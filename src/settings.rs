//! Reader settings.
//!
//! All user-tunable knobs are centralized here and loaded from a TOML file if
//! present. Any missing or invalid entry falls back to a sensible default so
//! the engine can always start. The engine itself only consumes `layout_mode`
//! and `scroll_speed`; the remaining fields are persisted on behalf of the
//! host so one settings record round-trips through one file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Reader configuration; deserializable from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReaderSettings {
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_line_height")]
    pub line_height: f32,
    #[serde(default)]
    pub theme: ThemeMode,
    #[serde(default)]
    pub font_family: FontFamily,
    #[serde(default)]
    pub auto_scroll_enabled: bool,
    #[serde(default = "default_scroll_speed")]
    pub scroll_speed: u8,
    #[serde(default)]
    pub layout_mode: LayoutMode,
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        ReaderSettings {
            font_size: default_font_size(),
            line_height: default_line_height(),
            theme: ThemeMode::default(),
            font_family: FontFamily::default(),
            auto_scroll_enabled: false,
            scroll_speed: default_scroll_speed(),
            layout_mode: LayoutMode::default(),
            log_level: default_log_level(),
        }
    }
}

/// How the host lays the document out.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    /// Continuous virtual scrolling over the line index.
    #[default]
    Scroll,
    /// Discrete fixed-size pages.
    Paged,
}

impl std::fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LayoutMode::Scroll => "Scroll",
            LayoutMode::Paged => "Paged",
        };
        write!(f, "{}", label)
    }
}

/// Theme mode.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeMode {
    Day,
    #[default]
    Night,
}

impl std::fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ThemeMode::Day => "Day",
            ThemeMode::Night => "Night",
        };
        write!(f, "{}", label)
    }
}

/// Font family options surfaced to the host.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FontFamily {
    #[default]
    Sans,
    Serif,
    Monospace,
}

impl std::fmt::Display for FontFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FontFamily::Sans => "Sans",
            FontFamily::Serif => "Serif",
            FontFamily::Monospace => "Monospace",
        };
        write!(f, "{}", label)
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

pub const MIN_FONT_SIZE: u32 = 12;
pub const MAX_FONT_SIZE: u32 = 36;
pub const MIN_SCROLL_SPEED: u8 = 1;
pub const MAX_SCROLL_SPEED: u8 = 10;

/// Load settings from the given path, falling back to defaults on error.
pub fn load_settings(path: &Path) -> ReaderSettings {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded settings file");
            data
        }
        Err(err) => {
            warn!(path = %path.display(), "Falling back to default settings: {err}");
            return ReaderSettings::default();
        }
    };

    match toml::from_str::<ReaderSettings>(&contents) {
        Ok(mut settings) => {
            debug!("Parsed settings from disk");
            clamp_settings(&mut settings);
            settings
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid settings TOML: {err}");
            ReaderSettings::default()
        }
    }
}

/// Force every numeric setting back into its supported range.
pub fn clamp_settings(settings: &mut ReaderSettings) {
    settings.font_size = settings.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
    settings.line_height = if settings.line_height.is_finite() {
        settings.line_height.clamp(0.8, 2.5)
    } else {
        default_line_height()
    };
    settings.scroll_speed = settings
        .scroll_speed
        .clamp(MIN_SCROLL_SPEED, MAX_SCROLL_SPEED);
}

fn default_font_size() -> u32 {
    16
}

fn default_line_height() -> f32 {
    1.4
}

fn default_scroll_speed() -> u8 {
    3
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}
