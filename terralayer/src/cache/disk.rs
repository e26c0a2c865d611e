//! On-disk tile cache.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use super::traits::TileCache;
use crate::coord::TileCoord;

/// Name of the cache directory created under the user temp directory.
pub const CACHE_DIR_NAME: &str = "ElevationCache";

const FILE_PREFIX: &str = "elevation_";
const FILE_EXTENSION: &str = "png";

/// Default cache root: `<user temp dir>/ElevationCache`.
pub fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join(CACHE_DIR_NAME)
}

/// Result of clearing the disk cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheClearResult {
    /// Number of tile files removed.
    pub files_deleted: usize,
    /// Bytes freed by the removal.
    pub bytes_freed: u64,
}

/// A tile file found in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedTile {
    pub tile: TileCoord,
    /// File size in bytes.
    pub bytes: u64,
}

/// Tile cache storing one file per tile in a flat directory.
#[derive(Debug, Clone)]
pub struct DiskTileCache {
    root: PathBuf,
}

impl DiskTileCache {
    /// Creates a cache rooted at `root`. The directory is created lazily on
    /// the first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the cache file for a tile.
    pub fn tile_path(&self, tile: TileCoord) -> PathBuf {
        self.root.join(format!(
            "{}{}_{}_{}.{}",
            FILE_PREFIX, tile.zoom, tile.x, tile.y, FILE_EXTENSION
        ))
    }

    /// Counts cached tile files and their total size.
    ///
    /// A missing root directory is an empty cache.
    pub fn stats(&self) -> io::Result<(usize, u64)> {
        let mut files = 0;
        let mut bytes = 0;
        for path in self.cached_files()? {
            if let Ok(metadata) = fs::metadata(&path) {
                files += 1;
                bytes += metadata.len();
            }
        }
        Ok((files, bytes))
    }

    /// Removes every cached tile file. Unrelated files are left alone.
    pub fn clear(&self) -> io::Result<CacheClearResult> {
        let mut result = CacheClearResult::default();
        for path in self.cached_files()? {
            let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            fs::remove_file(&path)?;
            result.files_deleted += 1;
            result.bytes_freed += size;
        }
        debug!(
            root = %self.root.display(),
            files = result.files_deleted,
            bytes = result.bytes_freed,
            "Cleared elevation cache"
        );
        Ok(result)
    }

    /// Lists the cached tiles, sorted by coordinate.
    ///
    /// Files with the cache prefix whose name is not a tile address are
    /// skipped.
    pub fn cached_tiles(&self) -> io::Result<Vec<CachedTile>> {
        let mut tiles = Vec::new();
        for path in self.cached_files()? {
            let Some(tile) = tile_from_path(&path) else {
                continue;
            };
            let bytes = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            tiles.push(CachedTile { tile, bytes });
        }
        tiles.sort_by_key(|cached| cached.tile);
        Ok(tiles)
    }

    /// Removes the cached tiles of one zoom level.
    pub fn clear_zoom(&self, zoom: u8) -> io::Result<CacheClearResult> {
        let mut result = CacheClearResult::default();
        for cached in self.cached_tiles()? {
            if cached.tile.zoom != zoom {
                continue;
            }
            fs::remove_file(self.tile_path(cached.tile))?;
            result.files_deleted += 1;
            result.bytes_freed += cached.bytes;
        }
        debug!(
            root = %self.root.display(),
            zoom,
            files = result.files_deleted,
            "Cleared elevation cache zoom level"
        );
        Ok(result)
    }

    fn cached_files(&self) -> io::Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if is_tile_file(&path) {
                files.push(path);
            }
        }
        Ok(files)
    }
}

/// Parses `elevation_{zoom}_{x}_{y}.png` back into a tile address.
fn tile_from_path(path: &Path) -> Option<TileCoord> {
    let stem = path.file_stem()?.to_str()?.strip_prefix(FILE_PREFIX)?;
    let mut parts = stem.split('_').map(str::parse::<u32>);
    let zoom = u8::try_from(parts.next()?.ok()?).ok()?;
    let x = parts.next()?.ok()?;
    let y = parts.next()?.ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(TileCoord::new(x, y, zoom))
}

fn is_tile_file(path: &Path) -> bool {
    let name_matches = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(FILE_PREFIX));
    let extension_matches = path.extension().and_then(|e| e.to_str()) == Some(FILE_EXTENSION);
    name_matches && extension_matches && path.is_file()
}

impl TileCache for DiskTileCache {
    async fn try_load(&self, tile: TileCoord) -> Option<Vec<u8>> {
        let path = self.tile_path(tile);
        match tokio::fs::read(&path).await {
            Ok(data) => {
                trace!(tile = %tile, bytes = data.len(), "Elevation cache hit");
                Some(data)
            }
            Err(e) => {
                trace!(tile = %tile, error = %e, "Elevation cache miss");
                None
            }
        }
    }

    async fn save(&self, tile: TileCoord, data: Vec<u8>) {
        if let Err(e) = tokio::fs::create_dir_all(&self.root).await {
            debug!(root = %self.root.display(), error = %e, "Could not create elevation cache dir");
            return;
        }
        let path = self.tile_path(tile);
        if let Err(e) = tokio::fs::write(&path, &data).await {
            debug!(tile = %tile, path = %path.display(), error = %e, "Elevation cache save failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_tile_path_naming() {
        let cache = DiskTileCache::new("/tmp/cache");
        assert_eq!(
            cache.tile_path(TileCoord::new(17, 42, 15)),
            PathBuf::from("/tmp/cache/elevation_15_17_42.png")
        );
    }

    #[test]
    fn test_default_cache_dir_is_under_temp() {
        let dir = default_cache_dir();
        assert!(dir.starts_with(std::env::temp_dir()));
        assert!(dir.ends_with(CACHE_DIR_NAME));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let cache = DiskTileCache::new(temp.path().join("nested"));
        let tile = TileCoord::new(1, 2, 3);

        cache.save(tile, vec![9, 8, 7]).await;

        assert_eq!(cache.try_load(tile).await, Some(vec![9, 8, 7]));
        assert!(cache.tile_path(tile).exists());
    }

    #[tokio::test]
    async fn test_missing_file_is_a_miss() {
        let temp = TempDir::new().unwrap();
        let cache = DiskTileCache::new(temp.path());
        assert_eq!(cache.try_load(TileCoord::new(5, 5, 5)).await, None);
    }

    #[tokio::test]
    async fn test_key_includes_zoom() {
        let temp = TempDir::new().unwrap();
        let cache = DiskTileCache::new(temp.path());

        cache.save(TileCoord::new(1, 1, 10), vec![1]).await;

        assert_eq!(cache.try_load(TileCoord::new(1, 1, 11)).await, None);
    }

    #[tokio::test]
    async fn test_save_failure_is_silent() {
        let temp = TempDir::new().unwrap();
        // A regular file where the cache directory should be
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        let cache = DiskTileCache::new(&blocker);
        cache.save(TileCoord::new(0, 0, 0), vec![1, 2]).await;

        assert_eq!(cache.try_load(TileCoord::new(0, 0, 0)).await, None);
    }

    #[tokio::test]
    async fn test_stats_and_clear() {
        let temp = TempDir::new().unwrap();
        let cache = DiskTileCache::new(temp.path());
        cache.save(TileCoord::new(0, 0, 1), vec![0; 10]).await;
        cache.save(TileCoord::new(1, 0, 1), vec![0; 20]).await;
        fs::write(temp.path().join("notes.txt"), b"keep me").unwrap();

        assert_eq!(cache.stats().unwrap(), (2, 30));

        let result = cache.clear().unwrap();
        assert_eq!(result.files_deleted, 2);
        assert_eq!(result.bytes_freed, 30);
        assert_eq!(cache.stats().unwrap(), (0, 0));
        assert!(temp.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_cached_tiles_and_clear_zoom() {
        let temp = TempDir::new().unwrap();
        let cache = DiskTileCache::new(temp.path());
        cache.save(TileCoord::new(5, 6, 12), vec![0; 4]).await;
        cache.save(TileCoord::new(4, 6, 12), vec![0; 8]).await;
        cache.save(TileCoord::new(1, 1, 3), vec![0; 2]).await;
        fs::write(temp.path().join("elevation_broken.png"), b"?").unwrap();

        let tiles = cache.cached_tiles().unwrap();
        assert_eq!(
            tiles,
            vec![
                CachedTile {
                    tile: TileCoord::new(1, 1, 3),
                    bytes: 2
                },
                CachedTile {
                    tile: TileCoord::new(4, 6, 12),
                    bytes: 8
                },
                CachedTile {
                    tile: TileCoord::new(5, 6, 12),
                    bytes: 4
                },
            ]
        );

        let result = cache.clear_zoom(12).unwrap();
        assert_eq!(result.files_deleted, 2);
        assert_eq!(result.bytes_freed, 12);
        assert_eq!(cache.cached_tiles().unwrap().len(), 1);
        assert!(temp.path().join("elevation_broken.png").exists());
    }

    #[test]
    fn test_tile_from_path() {
        let cache = DiskTileCache::new("/tmp/cache");
        let tile = TileCoord::new(17, 42, 15);
        assert_eq!(tile_from_path(&cache.tile_path(tile)), Some(tile));
        assert_eq!(tile_from_path(Path::new("elevation_300_1_1.png")), None);
        assert_eq!(tile_from_path(Path::new("elevation_1_2_3_4.png")), None);
        assert_eq!(tile_from_path(Path::new("other_1_2_3.png")), None);
    }

    #[test]
    fn test_stats_missing_root() {
        let temp = TempDir::new().unwrap();
        let cache = DiskTileCache::new(temp.path().join("does-not-exist"));
        assert_eq!(cache.stats().unwrap(), (0, 0));
    }
}
