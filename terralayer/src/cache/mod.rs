//! Elevation tile cache.
//!
//! Fetched tiles are persisted as the raw bytes returned by the tile source so
//! later imports of the same area skip the network. The cache is strictly
//! best-effort: a failed load is a miss and a failed save is ignored.
//!
//! # Implementations
//!
//! - [`DiskTileCache`]: files named `elevation_{zoom}_{x}_{y}.png` under an
//!   injected root directory (by default `<user temp>/ElevationCache`).
//! - [`MemoryTileCache`]: in-process map, used by tests and cache-less runs.

mod disk;
mod memory;
mod traits;

pub use disk::{default_cache_dir, CacheClearResult, CachedTile, DiskTileCache};
pub use memory::MemoryTileCache;
pub use traits::TileCache;
