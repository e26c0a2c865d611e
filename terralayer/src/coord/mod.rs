//! Coordinate conversion module
//!
//! Provides conversions between three coordinate systems:
//!
//! - **Local plane**: meters relative to a geographic origin, `+x` east and
//!   `+y` south, as used by the imported street map and the output heightmap.
//! - **Geographic**: longitude/latitude in degrees.
//! - **EPSG:3857**: the Web Mercator plane used to address raster tiles.
//!
//! The local plane uses a sinusoidal (Sanson-Flamsteed) projection around
//! the origin, matching how street geometry is placed by the importer.

mod projector;
mod types;

pub use projector::{CoordinateProjector, TILE_BORDER};
pub use types::{
    max_tile_index, CoordError, GeoOrigin, PixelAddress, TileCoord, TileRange, MAX_LAT, MAX_LON,
    MAX_ZOOM, MIN_LAT, MIN_LON, WEB_MERCATOR_HALF_EXTENT,
};

use std::f64::consts::PI;

/// Earth circumference used by the local sinusoidal projection, in meters.
pub const EARTH_CIRCUMFERENCE: f64 = 40_075_036.0;

/// Meters covered by one degree of latitude on the local plane.
pub const METERS_PER_DEGREE: f64 = EARTH_CIRCUMFERENCE / 360.0;

/// Converts geographic coordinates to EPSG:3857 meters.
///
/// # Arguments
///
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
#[inline]
pub fn to_web_mercator(lon: f64, lat: f64) -> Result<(f64, f64), CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }

    let x = lon * WEB_MERCATOR_HALF_EXTENT / 180.0;
    let y = ((90.0 + lat) * PI / 360.0).tan().ln() / (PI / 180.0);
    let y = y * WEB_MERCATOR_HALF_EXTENT / 180.0;

    Ok((x, y))
}

/// Converts EPSG:3857 meters back to longitude/latitude in degrees.
#[inline]
pub fn from_web_mercator(x: f64, y: f64) -> (f64, f64) {
    let lon = x / WEB_MERCATOR_HALF_EXTENT * 180.0;
    let lat = y / WEB_MERCATOR_HALF_EXTENT * 180.0;
    let lat = 180.0 / PI * (2.0 * (lat * PI / 180.0).exp().atan() - PI / 2.0);
    (lon, lat)
}

/// Converts a local-plane position to longitude/latitude.
#[inline]
pub fn local_to_geographic(origin: &GeoOrigin, local: [f64; 2]) -> Result<(f64, f64), CoordError> {
    let lat = origin.latitude - local[1] / METERS_PER_DEGREE;
    let meters_per_lon_degree = METERS_PER_DEGREE * lat.to_radians().cos();
    if !lat.is_finite() || meters_per_lon_degree.abs() < 1e-9 {
        return Err(CoordError::OutOfBounds {
            x: local[0],
            y: local[1],
        });
    }
    let lon = origin.longitude + local[0] / meters_per_lon_degree;
    Ok((lon, lat))
}

/// Converts longitude/latitude to a local-plane position.
#[inline]
pub fn geographic_to_local(origin: &GeoOrigin, lon: f64, lat: f64) -> [f64; 2] {
    [
        (lon - origin.longitude) * METERS_PER_DEGREE * lat.to_radians().cos(),
        -(lat - origin.latitude) * METERS_PER_DEGREE,
    ]
}

/// Resolves an EPSG:3857 position to a tile and the sub-pixel offset within it.
///
/// # Arguments
///
/// * `x`, `y` - Web Mercator meters
/// * `zoom` - Zoom level to address
/// * `tile_width`, `tile_height` - Tile dimensions in pixels
#[inline]
pub fn global_to_tile(
    x: f64,
    y: f64,
    zoom: u8,
    tile_width: u32,
    tile_height: u32,
) -> PixelAddress {
    let num_tiles = (1u64 << zoom) as f64;
    let tile_span = 2.0 * WEB_MERCATOR_HALF_EXTENT / num_tiles;
    let max_index = max_tile_index(zoom) as f64;

    let fx = (x + WEB_MERCATOR_HALF_EXTENT) / tile_span;
    let fy = (WEB_MERCATOR_HALF_EXTENT - y) / tile_span;
    let tile_x = fx.floor().clamp(0.0, max_index);
    let tile_y = fy.floor().clamp(0.0, max_index);

    PixelAddress {
        tile: TileCoord::new(tile_x as u32, tile_y as u32, zoom),
        pixel_x: (fx - tile_x) * tile_width as f64,
        pixel_y: (fy - tile_y) * tile_height as f64,
    }
}
