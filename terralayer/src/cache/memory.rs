//! In-memory tile cache.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::traits::TileCache;
use crate::coord::TileCoord;

/// Tile cache held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryTileCache {
    entries: RwLock<HashMap<TileCoord, Vec<u8>>>,
}

impl MemoryTileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the cache with bytes for a tile.
    pub fn insert(&self, tile: TileCoord, data: Vec<u8>) {
        self.entries.write().insert(tile, data);
    }

    pub fn contains(&self, tile: TileCoord) -> bool {
        self.entries.read().contains_key(&tile)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl TileCache for MemoryTileCache {
    async fn try_load(&self, tile: TileCoord) -> Option<Vec<u8>> {
        self.entries.read().get(&tile).cloned()
    }

    async fn save(&self, tile: TileCoord, data: Vec<u8>) {
        self.insert(tile, data);
    }
}
