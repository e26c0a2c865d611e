//! Cache trait shared by all tile cache backends.

use std::future::Future;

use crate::coord::TileCoord;

/// Best-effort storage for raw tile bytes keyed by tile coordinate.
///
/// The key is exactly `(x, y, zoom)`. Implementations never surface errors:
/// anything that goes wrong while loading is reported as a miss and anything
/// that goes wrong while saving is swallowed.
pub trait TileCache: Send + Sync {
    /// Loads the cached bytes for a tile, or `None` on a miss.
    fn try_load(&self, tile: TileCoord) -> impl Future<Output = Option<Vec<u8>>> + Send;

    /// Persists the bytes for a tile.
    fn save(&self, tile: TileCoord, data: Vec<u8>) -> impl Future<Output = ()> + Send;
}
