//! Typed `section.key` access for the `config` command.

use std::fmt;
use std::str::FromStr;

use super::file::{expand_tilde, parse_list, parse_value, ConfigError, ConfigFile};

/// A single settable configuration entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ElevationUrlTemplate,
    ElevationZoomLevels,
    ElevationTileWidth,
    ElevationTileHeight,
    ElevationMaxConcurrentRequests,
    ElevationRequestTimeoutSecs,
    CacheDirectory,
    LandscapeQuadSize,
    LandscapeRadius,
    LandscapeBlendGauge,
    LandscapeLayers,
    LoggingDirectory,
}

impl ConfigKey {
    /// Every key, grouped by section.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::ElevationUrlTemplate,
            ConfigKey::ElevationZoomLevels,
            ConfigKey::ElevationTileWidth,
            ConfigKey::ElevationTileHeight,
            ConfigKey::ElevationMaxConcurrentRequests,
            ConfigKey::ElevationRequestTimeoutSecs,
            ConfigKey::CacheDirectory,
            ConfigKey::LandscapeQuadSize,
            ConfigKey::LandscapeRadius,
            ConfigKey::LandscapeBlendGauge,
            ConfigKey::LandscapeLayers,
            ConfigKey::LoggingDirectory,
        ]
    }

    /// INI section the key lives in.
    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::ElevationUrlTemplate
            | ConfigKey::ElevationZoomLevels
            | ConfigKey::ElevationTileWidth
            | ConfigKey::ElevationTileHeight
            | ConfigKey::ElevationMaxConcurrentRequests
            | ConfigKey::ElevationRequestTimeoutSecs => "elevation",
            ConfigKey::CacheDirectory => "cache",
            ConfigKey::LandscapeQuadSize
            | ConfigKey::LandscapeRadius
            | ConfigKey::LandscapeBlendGauge
            | ConfigKey::LandscapeLayers => "landscape",
            ConfigKey::LoggingDirectory => "logging",
        }
    }

    /// Key name within its section.
    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::ElevationUrlTemplate => "url_template",
            ConfigKey::ElevationZoomLevels => "zoom_levels",
            ConfigKey::ElevationTileWidth => "tile_width",
            ConfigKey::ElevationTileHeight => "tile_height",
            ConfigKey::ElevationMaxConcurrentRequests => "max_concurrent_requests",
            ConfigKey::ElevationRequestTimeoutSecs => "request_timeout_secs",
            ConfigKey::CacheDirectory | ConfigKey::LoggingDirectory => "directory",
            ConfigKey::LandscapeQuadSize => "quad_size",
            ConfigKey::LandscapeRadius => "radius",
            ConfigKey::LandscapeBlendGauge => "blend_gauge",
            ConfigKey::LandscapeLayers => "layers",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as displayed by `config get`.
    pub fn get(&self, config: &ConfigFile) -> String {
        let e = &config.elevation;
        let l = &config.landscape;
        match self {
            ConfigKey::ElevationUrlTemplate => e.url_template.clone(),
            ConfigKey::ElevationZoomLevels => e.zoom_levels.to_string(),
            ConfigKey::ElevationTileWidth => e.tile_width.to_string(),
            ConfigKey::ElevationTileHeight => e.tile_height.to_string(),
            ConfigKey::ElevationMaxConcurrentRequests => e.max_concurrent_requests.to_string(),
            ConfigKey::ElevationRequestTimeoutSecs => e.request_timeout_secs.to_string(),
            ConfigKey::CacheDirectory => config.cache.directory.to_string_lossy().to_string(),
            ConfigKey::LandscapeQuadSize => l.quad_size.to_string(),
            ConfigKey::LandscapeRadius => l.radius.to_string(),
            ConfigKey::LandscapeBlendGauge => l.blend_gauge.to_string(),
            ConfigKey::LandscapeLayers => l.layers.join(", "),
            ConfigKey::LoggingDirectory => config.logging.directory.to_string_lossy().to_string(),
        }
    }

    /// Parses and stores a new value.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let name = self.name();
        let e = &mut config.elevation;
        match self {
            ConfigKey::ElevationUrlTemplate => e.url_template = value.trim().to_string(),
            ConfigKey::ElevationZoomLevels => e.zoom_levels = parse_value(&name, value)?,
            ConfigKey::ElevationTileWidth => e.tile_width = parse_value(&name, value)?,
            ConfigKey::ElevationTileHeight => e.tile_height = parse_value(&name, value)?,
            ConfigKey::ElevationMaxConcurrentRequests => {
                e.max_concurrent_requests = parse_value(&name, value)?
            }
            ConfigKey::ElevationRequestTimeoutSecs => {
                e.request_timeout_secs = parse_value(&name, value)?
            }
            ConfigKey::CacheDirectory => config.cache.directory = expand_tilde(value.trim()),
            ConfigKey::LandscapeQuadSize => config.landscape.quad_size = parse_value(&name, value)?,
            ConfigKey::LandscapeRadius => config.landscape.radius = parse_value(&name, value)?,
            ConfigKey::LandscapeBlendGauge => {
                config.landscape.blend_gauge = parse_value(&name, value)?
            }
            ConfigKey::LandscapeLayers => config.landscape.layers = parse_list(value),
            ConfigKey::LoggingDirectory => config.logging.directory = expand_tilde(value.trim()),
        }

        // Re-validate what the source descriptor depends on
        if self.section() == "elevation" {
            config.source()?;
        }
        Ok(())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == s.trim())
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "key".to_string(),
                value: s.to_string(),
                reason: "unknown configuration key".to_string(),
            })
    }
}
