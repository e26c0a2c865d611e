//! A successfully fetched and decoded elevation tile.

use crate::coord::TileCoord;
use crate::decode::{ElevationGrid, ElevationRange};

/// One decoded tile of the elevation mosaic.
///
/// Only tiles whose fetch succeeded are materialized as `RasterTile`; the
/// in-progress lifecycle of a fetch lives on the fetcher's
/// [`FetchBoard`](crate::fetch::FetchBoard).
#[derive(Debug, Clone, PartialEq)]
pub struct RasterTile {
    coord: TileCoord,
    grid: ElevationGrid,
}

impl RasterTile {
    pub fn new(coord: TileCoord, grid: ElevationGrid) -> Self {
        Self { coord, grid }
    }

    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    pub fn grid(&self) -> &ElevationGrid {
        &self.grid
    }

    /// Min/max over this tile's valid samples.
    pub fn range(&self) -> ElevationRange {
        self.grid.range()
    }
}
