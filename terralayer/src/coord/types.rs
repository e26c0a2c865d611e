//! Coordinate types for tile addressing and local planar positions.

use std::fmt;

use thiserror::Error;

/// Half the side length of the EPSG:3857 plane, in meters.
pub const WEB_MERCATOR_HALF_EXTENT: f64 = 20_037_508.342_789_244;

/// Maximum latitude representable in Web Mercator.
pub const MAX_LAT: f64 = 85.051_128_78;

/// Minimum latitude representable in Web Mercator.
pub const MIN_LAT: f64 = -85.051_128_78;

/// Minimum valid longitude.
pub const MIN_LON: f64 = -180.0;

/// Maximum valid longitude.
pub const MAX_LON: f64 = 180.0;

/// Maximum zoom level accepted by tile addressing.
pub const MAX_ZOOM: u8 = 24;

/// Errors raised by coordinate conversions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude outside the Web Mercator range.
    #[error("Invalid latitude: {0} (must be within ±{MAX_LAT})")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180].
    #[error("Invalid longitude: {0} (must be within ±180)")]
    InvalidLongitude(f64),

    /// Zoom level beyond what tile addressing supports.
    #[error("Invalid zoom level: {0} (max {MAX_ZOOM})")]
    InvalidZoom(u8),

    /// A projected point fell outside the EPSG:3857 plane.
    #[error("Point ({x:.2}, {y:.2}) is outside Web Mercator bounds")]
    OutOfBounds { x: f64, y: f64 },
}

/// Address of a single raster tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Column, west to east.
    pub x: u32,
    /// Row, north to south.
    pub y: u32,
    /// Zoom level.
    pub zoom: u8,
}

impl TileCoord {
    /// Creates a tile coordinate.
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// A position inside a specific tile, in (fractional) pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelAddress {
    /// The tile containing the position.
    pub tile: TileCoord,
    /// Horizontal pixel offset from the tile's left edge.
    pub pixel_x: f64,
    /// Vertical pixel offset from the tile's top edge.
    pub pixel_y: f64,
}

/// Geographic origin of the local planar coordinate system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoOrigin {
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
}

impl GeoOrigin {
    /// Creates a validated origin.
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, CoordError> {
        if !(MIN_LAT..=MAX_LAT).contains(&latitude) {
            return Err(CoordError::InvalidLatitude(latitude));
        }
        if !(MIN_LON..=MAX_LON).contains(&longitude) {
            return Err(CoordError::InvalidLongitude(longitude));
        }
        Ok(Self {
            longitude,
            latitude,
        })
    }
}

/// Inclusive rectangular range of tiles at a single zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub zoom: u8,
}

impl TileRange {
    /// Builds the smallest range containing every given tile.
    ///
    /// The tiles may arrive in any order; the range only depends on the
    /// minimum and maximum of their columns and rows. Returns `None` for an
    /// empty input.
    pub fn covering(tiles: &[TileCoord]) -> Option<Self> {
        let first = tiles.first()?;
        let mut range = Self {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
            zoom: first.zoom,
        };
        for tile in &tiles[1..] {
            range.min_x = range.min_x.min(tile.x);
            range.min_y = range.min_y.min(tile.y);
            range.max_x = range.max_x.max(tile.x);
            range.max_y = range.max_y.max(tile.y);
        }
        Some(range)
    }

    /// Grows the range by `border` tiles on every side, clamped to
    /// `[0, 2^zoom - 1]`.
    pub fn padded(&self, border: u32) -> Self {
        let max_index = max_tile_index(self.zoom);
        Self {
            min_x: self.min_x.saturating_sub(border),
            min_y: self.min_y.saturating_sub(border),
            max_x: self.max_x.saturating_add(border).min(max_index),
            max_y: self.max_y.saturating_add(border).min(max_index),
            zoom: self.zoom,
        }
    }

    /// Number of tiles in the range.
    pub fn len(&self) -> usize {
        let columns = (self.max_x - self.min_x + 1) as usize;
        let rows = (self.max_y - self.min_y + 1) as usize;
        columns * rows
    }

    /// A range always contains at least one tile.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether the tile lies inside the range.
    pub fn contains(&self, tile: &TileCoord) -> bool {
        tile.zoom == self.zoom
            && (self.min_x..=self.max_x).contains(&tile.x)
            && (self.min_y..=self.max_y).contains(&tile.y)
    }

    /// Iterates the tiles row by row, north to south and west to east.
    pub fn tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (self.min_y..=self.max_y).flat_map(move |y| {
            (self.min_x..=self.max_x).map(move |x| TileCoord::new(x, y, self.zoom))
        })
    }
}

/// Highest valid tile column/row index at a zoom level.
#[inline]
pub fn max_tile_index(zoom: u8) -> u32 {
    ((1u64 << zoom) - 1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_coord_display() {
        assert_eq!(TileCoord::new(3, 4, 12).to_string(), "12/3/4");
    }

    #[test]
    fn test_geo_origin_rejects_polar_latitude() {
        assert!(matches!(
            GeoOrigin::new(0.0, 89.0),
            Err(CoordError::InvalidLatitude(_))
        ));
        assert!(matches!(
            GeoOrigin::new(181.0, 0.0),
            Err(CoordError::InvalidLongitude(_))
        ));
        assert!(GeoOrigin::new(13.4, 52.5).is_ok());
    }

    #[test]
    fn test_covering_is_order_independent() {
        let a = TileCoord::new(10, 3, 5);
        let b = TileCoord::new(4, 9, 5);

        let forward = TileRange::covering(&[a, b]).unwrap();
        let backward = TileRange::covering(&[b, a]).unwrap();

        assert_eq!(forward, backward);
        assert_eq!((forward.min_x, forward.max_x), (4, 10));
        assert_eq!((forward.min_y, forward.max_y), (3, 9));
    }

    #[test]
    fn test_covering_empty() {
        assert!(TileRange::covering(&[]).is_none());
    }

    #[test]
    fn test_padded_expands_by_one_tile() {
        let range = TileRange {
            min_x: 100,
            min_y: 200,
            max_x: 102,
            max_y: 201,
            zoom: 12,
        };
        let padded = range.padded(1);
        assert_eq!(
            padded,
            TileRange {
                min_x: 99,
                min_y: 199,
                max_x: 103,
                max_y: 202,
                zoom: 12,
            }
        );
        assert_eq!(padded.len(), 5 * 4);
    }

    #[test]
    fn test_padded_clamps_to_valid_indices() {
        let range = TileRange {
            min_x: 0,
            min_y: 0,
            max_x: 7,
            max_y: 7,
            zoom: 3,
        };
        let padded = range.padded(1);
        assert_eq!(padded, range);
    }

    #[test]
    fn test_tiles_iteration_order() {
        let range = TileRange {
            min_x: 1,
            min_y: 5,
            max_x: 2,
            max_y: 6,
            zoom: 4,
        };
        let tiles: Vec<_> = range.tiles().collect();
        assert_eq!(
            tiles,
            vec![
                TileCoord::new(1, 5, 4),
                TileCoord::new(2, 5, 4),
                TileCoord::new(1, 6, 4),
                TileCoord::new(2, 6, 4),
            ]
        );
        assert!(range.contains(&TileCoord::new(2, 6, 4)));
        assert!(!range.contains(&TileCoord::new(2, 6, 5)));
    }

    #[test]
    fn test_max_tile_index() {
        assert_eq!(max_tile_index(0), 0);
        assert_eq!(max_tile_index(12), 4095);
    }
}
