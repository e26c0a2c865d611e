//! Tiled elevation raster source descriptor.
//!
//! A [`TiledMapSource`] describes where elevation tiles come from and how
//! they are laid out: pixel dimensions per tile, how many zoom levels exist
//! and the URL template used to fetch a tile.
//!
//! # URL Template
//!
//! Templates use `{zoom}`, `{x}` and `{y}` placeholders (`{z}` is accepted
//! as an alias for `{zoom}`):
//!
//! `https://s3.amazonaws.com/elevation-tiles-prod/terrarium/{zoom}/{x}/{y}.png`

use thiserror::Error;

use crate::coord::{TileCoord, MAX_ZOOM};

/// Default Terrarium elevation tile endpoint.
pub const TERRARIUM_URL_TEMPLATE: &str =
    "https://s3.amazonaws.com/elevation-tiles-prod/terrarium/{zoom}/{x}/{y}.png";

/// Pixel width and height of Terrarium tiles.
pub const TERRARIUM_TILE_SIZE: u32 = 256;

/// Zoom levels offered by the Terrarium source (0 to 15).
pub const TERRARIUM_NUM_LEVELS: u8 = 16;

/// Errors for invalid source descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("Tile dimensions must be non-zero, got {width}x{height}")]
    InvalidTileSize { width: u32, height: u32 },

    #[error("Number of zoom levels must be between 1 and {max}, got {levels}")]
    InvalidLevels { levels: u8, max: u8 },

    #[error("URL template is missing the {0} placeholder")]
    MissingPlaceholder(&'static str),
}

/// Immutable description of a tiled elevation raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TiledMapSource {
    tile_width: u32,
    tile_height: u32,
    num_levels: u8,
    url_template: String,
}

impl TiledMapSource {
    /// Creates a validated source descriptor.
    pub fn new(
        tile_width: u32,
        tile_height: u32,
        num_levels: u8,
        url_template: impl Into<String>,
    ) -> Result<Self, SourceError> {
        if tile_width == 0 || tile_height == 0 {
            return Err(SourceError::InvalidTileSize {
                width: tile_width,
                height: tile_height,
            });
        }
        if num_levels == 0 || num_levels > MAX_ZOOM + 1 {
            return Err(SourceError::InvalidLevels {
                levels: num_levels,
                max: MAX_ZOOM + 1,
            });
        }

        let url_template = url_template.into();
        if !url_template.contains("{zoom}") && !url_template.contains("{z}") {
            return Err(SourceError::MissingPlaceholder("{zoom}"));
        }
        if !url_template.contains("{x}") {
            return Err(SourceError::MissingPlaceholder("{x}"));
        }
        if !url_template.contains("{y}") {
            return Err(SourceError::MissingPlaceholder("{y}"));
        }

        Ok(Self {
            tile_width,
            tile_height,
            num_levels,
            url_template,
        })
    }

    /// The Terrarium-encoded global elevation tiles.
    pub fn terrarium() -> Self {
        Self {
            tile_width: TERRARIUM_TILE_SIZE,
            tile_height: TERRARIUM_TILE_SIZE,
            num_levels: TERRARIUM_NUM_LEVELS,
            url_template: TERRARIUM_URL_TEMPLATE.to_string(),
        }
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    pub fn num_levels(&self) -> u8 {
        self.num_levels
    }

    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    /// The highest-resolution zoom level.
    pub fn finest_zoom(&self) -> u8 {
        self.num_levels - 1
    }

    /// Builds the fetch URL for a tile.
    pub fn tile_url(&self, tile: &TileCoord) -> String {
        self.url_template
            .replace("{zoom}", &tile.zoom.to_string())
            .replace("{z}", &tile.zoom.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }
}

impl Default for TiledMapSource {
    fn default() -> Self {
        Self::terrarium()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terrarium_defaults() {
        let source = TiledMapSource::terrarium();
        assert_eq!(source.tile_width(), 256);
        assert_eq!(source.tile_height(), 256);
        assert_eq!(source.num_levels(), 16);
        assert_eq!(source.finest_zoom(), 15);
    }

    #[test]
    fn test_tile_url() {
        let source = TiledMapSource::terrarium();
        let url = source.tile_url(&TileCoord::new(17_000, 11_000, 15));
        assert_eq!(
            url,
            "https://s3.amazonaws.com/elevation-tiles-prod/terrarium/15/17000/11000.png"
        );
    }

    #[test]
    fn test_tile_url_with_z_alias() {
        let source = TiledMapSource::new(512, 512, 12, "http://tiles.test/{z}/{x}/{y}.png").unwrap();
        assert_eq!(
            source.tile_url(&TileCoord::new(1, 2, 3)),
            "http://tiles.test/3/1/2.png"
        );
    }

    #[test]
    fn test_new_rejects_invalid_descriptors() {
        assert!(matches!(
            TiledMapSource::new(0, 256, 16, TERRARIUM_URL_TEMPLATE),
            Err(SourceError::InvalidTileSize { .. })
        ));
        assert!(matches!(
            TiledMapSource::new(256, 256, 0, TERRARIUM_URL_TEMPLATE),
            Err(SourceError::InvalidLevels { .. })
        ));
        assert_eq!(
            TiledMapSource::new(256, 256, 16, "http://tiles.test/{zoom}/{x}.png"),
            Err(SourceError::MissingPlaceholder("{y}"))
        );
    }
}
