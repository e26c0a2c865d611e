//! Configuration file support.
//!
//! Settings live in an INI file at `~/.terralayer/config.ini`:
//!
//! ```ini
//! [elevation]
//! url_template = https://s3.amazonaws.com/elevation-tiles-prod/terrarium/{zoom}/{x}/{y}.png
//! zoom_levels = 16
//! tile_width = 256
//! tile_height = 256
//! max_concurrent_requests = 10
//! request_timeout_secs = 10
//!
//! [cache]
//! directory = /tmp/ElevationCache
//!
//! [landscape]
//! quad_size = 5
//! radius = 2000
//! blend_gauge = 2
//! layers = Ground, Grass, Wood
//!
//! [logging]
//! directory = ~/.terralayer/logs
//! ```
//!
//! Missing files and missing keys fall back to defaults.

mod file;
mod keys;

pub use file::{
    CacheSettings, ConfigError, ConfigFile, ElevationSettings, LandscapeSettings, LoggingSettings,
};
pub use keys::ConfigKey;

use std::path::PathBuf;

/// Directory holding the configuration file and default logs.
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".terralayer")
}

/// Path of the configuration file.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// Formats a byte count for display, e.g. `1.5 MB`.
pub fn format_size(bytes: usize) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}
