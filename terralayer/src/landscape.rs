//! End-to-end landscape build.
//!
//! Runs the three phases of an import in order: load the elevation model,
//! reproject it onto the vertex grid and paint the land-use blend weights.
//! Each phase honours the same cancellation token and reports progress
//! through one callback.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cache::TileCache;
use crate::coord::{CoordinateProjector, GeoOrigin};
use crate::decode::ElevationRange;
use crate::fetch::{FetchProgress, FetchProgressCallback, TileFetcher};
use crate::landuse::{paint_blend_weights, BlendProgressCallback, LandUseWay, WeightLayer};
use crate::model::{ElevationError, ElevationModel};
use crate::provider::AsyncHttpClient;
use crate::reproject::{BuildTransform, Heightmap, ReprojectProgressCallback, Reprojector};
use crate::settings::{BuildSettings, GridLayout};

/// Phase of a landscape build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Downloading,
    Reprojecting,
    PaintingWeights,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildPhase::Downloading => write!(f, "Downloading elevation model"),
            BuildPhase::Reprojecting => write!(f, "Reprojecting elevation model"),
            BuildPhase::PaintingWeights => write!(f, "Rasterizing blend weights"),
        }
    }
}

/// Progress within the current phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildProgress {
    pub phase: BuildPhase,
    /// Completed share of the phase in `[0, 1]`.
    pub fraction: f64,
    /// Finished and total items (tiles while downloading, otherwise `None`).
    pub items: Option<(usize, usize)>,
}

/// Shared progress callback for a whole build.
pub type BuildProgressCallback = Arc<dyn Fn(BuildProgress) + Send + Sync>;

/// Everything a landscape consumer needs.
#[derive(Debug, Clone)]
pub struct LandscapeBuild {
    pub heightmap: Heightmap,
    pub transform: BuildTransform,
    pub layout: GridLayout,
    /// Range the heightmap was quantized against.
    pub elevation_range: ElevationRange,
    /// Static lighting LOD suggested for the grid size.
    pub lighting_lod: u32,
    /// Weight layers in configured order, base layer first.
    pub weight_layers: Vec<WeightLayer>,
}

/// Builds a landscape around `origin`.
///
/// # Arguments
///
/// * `settings` - Grid spacing, radius, blend gauge and layers
/// * `origin` - Geographic center of the local plane
/// * `fetcher` - Tile fetcher bound to the elevation source
/// * `ways` - Land-use ways in local-plane meters
/// * `cancellation` - Aborts the build at the next check
/// * `on_progress` - Receives per-phase progress
pub async fn build_landscape<C, K>(
    settings: &BuildSettings,
    origin: GeoOrigin,
    fetcher: &TileFetcher<C, K>,
    ways: Vec<LandUseWay>,
    cancellation: &CancellationToken,
    on_progress: Option<BuildProgressCallback>,
) -> Result<LandscapeBuild, ElevationError>
where
    C: AsyncHttpClient,
    K: TileCache,
{
    let layout = settings.layout()?;
    let projector = CoordinateProjector::new(origin, fetcher.source());

    info!(
        lon = origin.longitude,
        lat = origin.latitude,
        size = layout.size(),
        subsection = layout.subsection_size_quads,
        "Building landscape"
    );

    // 1. elevation model
    let fetch_progress: Option<FetchProgressCallback> = on_progress.clone().map(|cb| {
        Box::new(move |p: FetchProgress| {
            cb(BuildProgress {
                phase: BuildPhase::Downloading,
                fraction: p.fraction(),
                items: Some((p.completed, p.total)),
            })
        }) as FetchProgressCallback
    });

    let mut model = ElevationModel::new();
    model
        .load_elevation_data(
            &projector,
            settings,
            fetcher,
            cancellation,
            fetch_progress.as_ref(),
        )
        .await?;

    // 2. heightmap
    let reproject_progress: Option<ReprojectProgressCallback> =
        on_progress.clone().map(|cb| phase_callback(cb, BuildPhase::Reprojecting));
    let (model, heightmap, transform) = {
        let settings = settings.clone();
        let token = cancellation.clone();
        tokio::task::spawn_blocking(move || {
            let reprojector = Reprojector::new(&projector, &model, &settings)?;
            let (heightmap, transform) = reprojector.reproject(&token, reproject_progress.as_ref())?;
            Ok::<_, ElevationError>((model, heightmap, transform))
        })
        .await
        .map_err(|e| ElevationError::TaskFailed(e.to_string()))??
    };

    // 3. blend weights
    let blend_progress: Option<BlendProgressCallback> =
        on_progress.map(|cb| phase_callback(cb, BuildPhase::PaintingWeights));
    let weight_layers = {
        let settings = settings.clone();
        let token = cancellation.clone();
        tokio::task::spawn_blocking(move || {
            paint_blend_weights(&settings, &layout, &ways, &token, blend_progress.as_ref())
        })
        .await
        .map_err(|e| ElevationError::TaskFailed(e.to_string()))??
    };

    let build = LandscapeBuild {
        heightmap,
        transform,
        layout,
        elevation_range: model.range(),
        lighting_lod: layout.lighting_lod(),
        weight_layers,
    };

    info!(
        size = layout.size(),
        lighting_lod = build.lighting_lod,
        scale_xy = build.transform.scale[0],
        scale_z = build.transform.scale[2],
        "Landscape built"
    );
    Ok(build)
}

fn phase_callback(cb: BuildProgressCallback, phase: BuildPhase) -> Box<dyn Fn(f64) + Send + Sync> {
    Box::new(move |fraction| {
        cb(BuildProgress {
            phase,
            fraction,
            items: None,
        })
    })
}
