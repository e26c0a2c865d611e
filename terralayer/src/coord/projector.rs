//! Local-plane to tile-space projection for a single import session.

use tracing::debug;

use super::types::{CoordError, GeoOrigin, PixelAddress, TileCoord, TileRange};
use super::{global_to_tile, local_to_geographic, to_web_mercator, WEB_MERCATOR_HALF_EXTENT};
use crate::source::TiledMapSource;

/// Tiles of padding fetched around the footprint so the resampling kernel
/// never runs out of neighbours at the footprint edge.
pub const TILE_BORDER: u32 = 1;

/// Maps local-plane positions to tiles of a [`TiledMapSource`].
///
/// All addressing happens at the finest zoom level the source offers.
#[derive(Debug, Clone)]
pub struct CoordinateProjector {
    origin: GeoOrigin,
    tile_width: u32,
    tile_height: u32,
    zoom: u8,
}

impl CoordinateProjector {
    /// Creates a projector for the given origin and tile source.
    pub fn new(origin: GeoOrigin, source: &TiledMapSource) -> Self {
        Self {
            origin,
            tile_width: source.tile_width(),
            tile_height: source.tile_height(),
            zoom: source.finest_zoom(),
        }
    }

    /// The geographic origin of the local plane.
    pub fn origin(&self) -> GeoOrigin {
        self.origin
    }

    /// The zoom level used for all tile addressing.
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Projects a local-plane position onto the EPSG:3857 plane.
    ///
    /// Fails with [`CoordError::OutOfBounds`] when the position leaves the
    /// valid Web Mercator area.
    pub fn to_global_plane(&self, local: [f64; 2]) -> Result<(f64, f64), CoordError> {
        let out_of_bounds = || CoordError::OutOfBounds {
            x: local[0],
            y: local[1],
        };

        let (lon, lat) = local_to_geographic(&self.origin, local)?;
        let (x, y) = to_web_mercator(lon, lat).map_err(|_| out_of_bounds())?;
        if x.abs() > WEB_MERCATOR_HALF_EXTENT || y.abs() > WEB_MERCATOR_HALF_EXTENT {
            return Err(out_of_bounds());
        }
        Ok((x, y))
    }

    /// Resolves an EPSG:3857 position to a tile and sub-pixel offset.
    pub fn global_to_tile(&self, x: f64, y: f64) -> PixelAddress {
        global_to_tile(x, y, self.zoom, self.tile_width, self.tile_height)
    }

    /// Projects a local-plane position directly to a tile address.
    pub fn local_to_pixel(&self, local: [f64; 2]) -> Result<PixelAddress, CoordError> {
        let (x, y) = self.to_global_plane(local)?;
        Ok(self.global_to_tile(x, y))
    }

    /// Selects every tile needed to cover a square of the given half extent
    /// centered on the origin, plus a [`TILE_BORDER`] frame.
    ///
    /// Tile rows and columns may increase in either direction relative to the
    /// local axes, so the range is taken over all four projected corners.
    pub fn select_tiles(&self, half_extent: f64) -> Result<TileRange, CoordError> {
        let corners = [
            [-half_extent, half_extent],
            [half_extent, half_extent],
            [half_extent, -half_extent],
            [-half_extent, -half_extent],
        ];

        let mut tiles: Vec<TileCoord> = Vec::with_capacity(corners.len());
        for corner in corners {
            tiles.push(self.local_to_pixel(corner)?.tile);
        }

        let footprint = TileRange::covering(&tiles).ok_or(CoordError::OutOfBounds {
            x: half_extent,
            y: half_extent,
        })?;
        let range = footprint.padded(TILE_BORDER);

        debug!(
            zoom = self.zoom,
            min_x = range.min_x,
            min_y = range.min_y,
            max_x = range.max_x,
            max_y = range.max_y,
            tiles = range.len(),
            "Selected elevation tiles"
        );

        Ok(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::max_tile_index;

    fn projector(lon: f64, lat: f64) -> CoordinateProjector {
        CoordinateProjector::new(GeoOrigin::new(lon, lat).unwrap(), &TiledMapSource::terrarium())
    }

    #[test]
    fn test_uses_finest_zoom() {
        let projector = projector(0.0, 0.0);
        assert_eq!(projector.zoom(), TiledMapSource::terrarium().num_levels() - 1);
    }

    #[test]
    fn test_origin_projects_to_origin_tile() {
        let projector = projector(13.405, 52.52);
        let address = projector.local_to_pixel([0.0, 0.0]).unwrap();
        let (x, y) = to_web_mercator(13.405, 52.52).unwrap();
        let expected = global_to_tile(x, y, projector.zoom(), 256, 256);
        assert_eq!(address, expected);
    }

    #[test]
    fn test_to_global_plane_out_of_bounds() {
        let projector = projector(0.0, 85.0);
        // 100 km north of 85°N is beyond the Web Mercator limit
        let result = projector.to_global_plane([0.0, -100_000.0]);
        assert!(matches!(result, Err(CoordError::OutOfBounds { .. })));
    }

    #[test]
    fn test_select_tiles_matches_padded_corner_range() {
        let projector = projector(11.5761, 48.1374);
        let half_extent = 3_000.0;

        let corners: Vec<TileCoord> = [
            [-half_extent, half_extent],
            [half_extent, -half_extent],
            [half_extent, half_extent],
            [-half_extent, -half_extent],
        ]
        .iter()
        .map(|c| projector.local_to_pixel(*c).unwrap().tile)
        .collect();

        let tx0 = corners.iter().map(|t| t.x).min().unwrap();
        let tx1 = corners.iter().map(|t| t.x).max().unwrap();
        let ty0 = corners.iter().map(|t| t.y).min().unwrap();
        let ty1 = corners.iter().map(|t| t.y).max().unwrap();
        let max_index = max_tile_index(projector.zoom());

        let range = projector.select_tiles(half_extent).unwrap();
        assert_eq!(range.min_x, tx0.saturating_sub(1));
        assert_eq!(range.max_x, (tx1 + 1).min(max_index));
        assert_eq!(range.min_y, ty0.saturating_sub(1));
        assert_eq!(range.max_y, (ty1 + 1).min(max_index));
        assert_eq!(range.zoom, projector.zoom());
    }

    #[test]
    fn test_select_tiles_rejects_invalid_bounds() {
        let projector = projector(0.0, 85.0);
        assert!(matches!(
            projector.select_tiles(200_000.0),
            Err(CoordError::OutOfBounds { .. })
        ));
    }
}
