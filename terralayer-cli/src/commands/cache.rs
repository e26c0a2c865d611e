//! Elevation cache inspection and cleanup.

use std::collections::BTreeMap;

use clap::Subcommand;
use terralayer::cache::{CachedTile, DiskTileCache};
use terralayer::config::{format_size, ConfigFile};
use terralayer::coord::{from_web_mercator, TileCoord, TileRange, WEB_MERCATOR_HALF_EXTENT};

use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Remove cached elevation tiles
    Clear {
        /// Only remove tiles of this zoom level
        #[arg(long)]
        zoom: Option<u8>,
    },
    /// Show cached tiles per zoom level and the area they cover
    Stats,
}

/// Cached tiles of one zoom level.
#[derive(Debug, Clone, PartialEq)]
struct ZoomSummary {
    zoom: u8,
    tiles: usize,
    bytes: u64,
    range: TileRange,
}

/// Run a cache subcommand.
pub fn run(action: CacheAction) -> Result<(), CliError> {
    let config = ConfigFile::load().unwrap_or_default();
    let cache = DiskTileCache::new(&config.cache.directory);

    match action {
        CacheAction::Clear { zoom } => {
            let result = match zoom {
                Some(zoom) => {
                    println!("Removing zoom {} tiles from {}", zoom, cache.root().display());
                    cache.clear_zoom(zoom)
                }
                None => {
                    println!("Removing all tiles from {}", cache.root().display());
                    cache.clear()
                }
            }
            .map_err(|e| CliError::CacheClear(e.to_string()))?;

            println!(
                "{} tiles removed, {} freed",
                result.files_deleted,
                format_size(result.bytes_freed as usize)
            );
            Ok(())
        }
        CacheAction::Stats => {
            let tiles = cache
                .cached_tiles()
                .map_err(|e| CliError::CacheStats(e.to_string()))?;
            print_stats(&cache, &tiles);
            Ok(())
        }
    }
}

fn print_stats(cache: &DiskTileCache, tiles: &[CachedTile]) {
    let total_bytes: u64 = tiles.iter().map(|t| t.bytes).sum();
    println!("Elevation cache: {}", cache.root().display());
    println!("{} tiles, {}", tiles.len(), format_size(total_bytes as usize));

    let summaries = summarize(tiles);
    if summaries.is_empty() {
        return;
    }

    println!();
    println!(
        "{:>4}  {:>6}  {:>10}  {:>11}  {:>11}  coverage (W, S, E, N)",
        "zoom", "tiles", "size", "columns", "rows"
    );
    for summary in summaries {
        let [west, south, east, north] = geographic_bounds(&summary.range);
        println!(
            "{:>4}  {:>6}  {:>10}  {:>11}  {:>11}  {:.4}, {:.4}, {:.4}, {:.4}",
            summary.zoom,
            summary.tiles,
            format_size(summary.bytes as usize),
            format!("{}-{}", summary.range.min_x, summary.range.max_x),
            format!("{}-{}", summary.range.min_y, summary.range.max_y),
            west,
            south,
            east,
            north
        );
    }
}

/// Groups cached tiles by zoom level, lowest zoom first.
fn summarize(tiles: &[CachedTile]) -> Vec<ZoomSummary> {
    let mut by_zoom: BTreeMap<u8, Vec<&CachedTile>> = BTreeMap::new();
    for cached in tiles {
        by_zoom.entry(cached.tile.zoom).or_default().push(cached);
    }

    by_zoom
        .into_iter()
        .filter_map(|(zoom, cached)| {
            let coords: Vec<TileCoord> = cached.iter().map(|c| c.tile).collect();
            Some(ZoomSummary {
                zoom,
                tiles: cached.len(),
                bytes: cached.iter().map(|c| c.bytes).sum(),
                range: TileRange::covering(&coords)?,
            })
        })
        .collect()
}

/// Longitude/latitude box `[west, south, east, north]` of a tile range.
fn geographic_bounds(range: &TileRange) -> [f64; 4] {
    let tiles_per_side = f64::from(1u32 << range.zoom);
    let tile_span = 2.0 * WEB_MERCATOR_HALF_EXTENT / tiles_per_side;

    let west_x = -WEB_MERCATOR_HALF_EXTENT + f64::from(range.min_x) * tile_span;
    let east_x = -WEB_MERCATOR_HALF_EXTENT + f64::from(range.max_x + 1) * tile_span;
    let north_y = WEB_MERCATOR_HALF_EXTENT - f64::from(range.min_y) * tile_span;
    let south_y = WEB_MERCATOR_HALF_EXTENT - f64::from(range.max_y + 1) * tile_span;

    let (west, north) = from_web_mercator(west_x, north_y);
    let (east, south) = from_web_mercator(east_x, south_y);
    [west, south, east, north]
}
