//! INI-backed configuration file.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::{config_directory, config_file_path};
use crate::cache::default_cache_dir;
use crate::fetch::{FetchConfig, DEFAULT_MAX_CONCURRENT_REQUESTS};
use crate::settings::{
    BuildSettings, DEFAULT_BLEND_GAUGE, DEFAULT_LAYERS, DEFAULT_QUAD_SIZE, DEFAULT_RADIUS,
};
use crate::source::{
    SourceError, TiledMapSource, TERRARIUM_NUM_LEVELS, TERRARIUM_TILE_SIZE, TERRARIUM_URL_TEMPLATE,
};

/// Errors reading or writing the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(String),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Invalid elevation source: {0}")]
    Source(#[from] SourceError),
}

/// `[elevation]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationSettings {
    pub url_template: String,
    pub zoom_levels: u8,
    pub tile_width: u32,
    pub tile_height: u32,
    pub max_concurrent_requests: usize,
    pub request_timeout_secs: u64,
}

impl Default for ElevationSettings {
    fn default() -> Self {
        Self {
            url_template: TERRARIUM_URL_TEMPLATE.to_string(),
            zoom_levels: TERRARIUM_NUM_LEVELS,
            tile_width: TERRARIUM_TILE_SIZE,
            tile_height: TERRARIUM_TILE_SIZE,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            request_timeout_secs: 10,
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub directory: PathBuf,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
        }
    }
}

/// `[landscape]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LandscapeSettings {
    pub quad_size: f64,
    pub radius: f64,
    pub blend_gauge: f64,
    pub layers: Vec<String>,
}

impl Default for LandscapeSettings {
    fn default() -> Self {
        Self {
            quad_size: DEFAULT_QUAD_SIZE,
            radius: DEFAULT_RADIUS,
            blend_gauge: DEFAULT_BLEND_GAUGE,
            layers: DEFAULT_LAYERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: config_directory().join("logs"),
        }
    }
}

/// The complete configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub elevation: ElevationSettings,
    pub cache: CacheSettings,
    pub landscape: LandscapeSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Loads the configuration from the default path.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Loads the configuration from `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_ini(&ini)
    }

    /// Writes the configuration to the default path.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Writes the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.to_ini().write_to_file(path)?;
        Ok(())
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("elevation")) {
            let e = &mut config.elevation;
            if let Some(v) = section.get("url_template") {
                e.url_template = v.to_string();
            }
            if let Some(v) = section.get("zoom_levels") {
                e.zoom_levels = parse_value("elevation.zoom_levels", v)?;
            }
            if let Some(v) = section.get("tile_width") {
                e.tile_width = parse_value("elevation.tile_width", v)?;
            }
            if let Some(v) = section.get("tile_height") {
                e.tile_height = parse_value("elevation.tile_height", v)?;
            }
            if let Some(v) = section.get("max_concurrent_requests") {
                e.max_concurrent_requests = parse_value("elevation.max_concurrent_requests", v)?;
            }
            if let Some(v) = section.get("request_timeout_secs") {
                e.request_timeout_secs = parse_value("elevation.request_timeout_secs", v)?;
            }
        }

        if let Some(section) = ini.section(Some("cache")) {
            if let Some(v) = section.get("directory") {
                config.cache.directory = expand_tilde(v);
            }
        }

        if let Some(section) = ini.section(Some("landscape")) {
            let l = &mut config.landscape;
            if let Some(v) = section.get("quad_size") {
                l.quad_size = parse_value("landscape.quad_size", v)?;
            }
            if let Some(v) = section.get("radius") {
                l.radius = parse_value("landscape.radius", v)?;
            }
            if let Some(v) = section.get("blend_gauge") {
                l.blend_gauge = parse_value("landscape.blend_gauge", v)?;
            }
            if let Some(v) = section.get("layers") {
                l.layers = parse_list(v);
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(v) = section.get("directory") {
                config.logging.directory = expand_tilde(v);
            }
        }

        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        let e = &self.elevation;
        ini.with_section(Some("elevation"))
            .set("url_template", e.url_template.as_str())
            .set("zoom_levels", e.zoom_levels.to_string())
            .set("tile_width", e.tile_width.to_string())
            .set("tile_height", e.tile_height.to_string())
            .set("max_concurrent_requests", e.max_concurrent_requests.to_string())
            .set("request_timeout_secs", e.request_timeout_secs.to_string());
        ini.with_section(Some("cache"))
            .set("directory", self.cache.directory.to_string_lossy().to_string());
        let l = &self.landscape;
        ini.with_section(Some("landscape"))
            .set("quad_size", l.quad_size.to_string())
            .set("radius", l.radius.to_string())
            .set("blend_gauge", l.blend_gauge.to_string())
            .set("layers", l.layers.join(", "));
        ini.with_section(Some("logging"))
            .set("directory", self.logging.directory.to_string_lossy().to_string());
        ini
    }

    /// The tile source described by `[elevation]`.
    pub fn source(&self) -> Result<TiledMapSource, ConfigError> {
        let e = &self.elevation;
        Ok(TiledMapSource::new(
            e.tile_width,
            e.tile_height,
            e.zoom_levels,
            e.url_template.clone(),
        )?)
    }

    /// Fetcher tunables from `[elevation]`.
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            max_concurrent_requests: self.elevation.max_concurrent_requests,
            request_timeout: Duration::from_secs(self.elevation.request_timeout_secs),
        }
    }

    /// Build settings from `[landscape]`.
    pub fn build_settings(&self) -> BuildSettings {
        let l = &self.landscape;
        BuildSettings {
            quad_size: l.quad_size,
            radius: l.radius,
            blend_gauge: l.blend_gauge,
            layers: l.layers.clone(),
        }
    }
}

pub(crate) fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

pub(crate) fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn expand_tilde(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(value)),
        None => PathBuf::from(value),
    }
}
