//! The elevation model: every tile needed for one landscape build.
//!
//! [`ElevationModel::load_elevation_data`] selects the tiles covering the
//! build footprint, fetches them as one all-or-nothing batch and keeps the
//! decoded rasters keyed by coordinate. The union of the tiles' elevation
//! ranges becomes the quantization range of the whole heightmap.

mod error;
mod tile;

pub use error::ElevationError;
pub use tile::RasterTile;

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::cache::TileCache;
use crate::coord::{CoordinateProjector, TileCoord};
use crate::decode::ElevationRange;
use crate::fetch::{BatchError, FetchProgressCallback, TileFetcher};
use crate::provider::AsyncHttpClient;
use crate::settings::BuildSettings;

/// Decoded elevation tiles plus their combined elevation range.
#[derive(Debug, Clone, Default)]
pub struct ElevationModel {
    tiles: HashMap<TileCoord, RasterTile>,
    range: ElevationRange,
}

impl ElevationModel {
    /// An empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a model from already decoded tiles.
    pub fn from_tiles(tiles: impl IntoIterator<Item = RasterTile>) -> Self {
        let mut model = Self::new();
        for tile in tiles {
            model.insert(tile);
        }
        model
    }

    fn insert(&mut self, tile: RasterTile) {
        self.range.union(&tile.range());
        self.tiles.insert(tile.coord(), tile);
    }

    /// Fetches every tile the build footprint needs.
    ///
    /// The footprint is the square spanned by the settings' grid layout around
    /// the projector's origin, padded by one tile. Succeeds only if every
    /// tile was fetched; on failure the model is left unchanged.
    pub async fn load_elevation_data<C, K>(
        &mut self,
        projector: &CoordinateProjector,
        settings: &BuildSettings,
        fetcher: &TileFetcher<C, K>,
        cancellation: &CancellationToken,
        on_progress: Option<&FetchProgressCallback>,
    ) -> Result<(), ElevationError>
    where
        C: AsyncHttpClient,
        K: TileCache,
    {
        let layout = settings.layout()?;
        let half_extent = layout.half_extent(settings.quad_size);

        let range = projector.select_tiles(half_extent).map_err(|e| {
            let err = ElevationError::BoundsInvalid(e);
            error!(half_extent, error = %err, "Elevation bounds rejected");
            err
        })?;
        let tiles: Vec<TileCoord> = range.tiles().collect();

        info!(
            tiles = tiles.len(),
            zoom = range.zoom,
            half_extent,
            "Loading elevation data"
        );

        let rasters = match fetcher.fetch_all(&tiles, cancellation, on_progress).await {
            Ok(rasters) => rasters,
            Err(BatchError::Cancelled) => return Err(ElevationError::Cancelled),
            Err(BatchError::Incomplete {
                failed,
                total,
                first,
            }) => {
                let err = ElevationError::DownloadIncomplete { failed, total };
                error!(first_failure = %first, "{}", err);
                return Err(err);
            }
        };

        for raster in rasters {
            self.insert(raster);
        }

        info!(
            tiles = self.tiles.len(),
            min = self.range.min,
            max = self.range.max,
            "Elevation data loaded"
        );
        Ok(())
    }

    /// Looks up a downloaded tile.
    pub fn get_tile(&self, tile: &TileCoord) -> Option<&RasterTile> {
        self.tiles.get(tile)
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Union of the elevation ranges of all tiles.
    pub fn range(&self) -> ElevationRange {
        self.range
    }
}
