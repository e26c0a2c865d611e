//! TerraLayer - real-world elevation import for terrain heightmaps
//!
//! Builds a quantized 16-bit heightmap around a geographic origin from
//! Terrarium-encoded Web Mercator elevation tiles:
//!
//! 1. [`coord::CoordinateProjector`] selects the tiles covering the footprint.
//! 2. [`fetch::TileFetcher`] downloads them under a concurrency ceiling,
//!    backed by a [`cache::TileCache`], and [`decode`] turns them into grids.
//! 3. [`model::ElevationModel`] collects the tiles and their elevation range.
//! 4. [`reproject::Reprojector`] Lanczos-samples every vertex and quantizes it.
//! 5. [`landuse`] paints material blend weights from land-use polygons.
//!
//! [`landscape::build_landscape`] runs all of it.

pub mod cache;
pub mod config;
pub mod coord;
pub mod decode;
pub mod fetch;
pub mod landscape;
pub mod landuse;
pub mod logging;
pub mod model;
pub mod provider;
pub mod reproject;
pub mod resample;
pub mod settings;
pub mod source;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
