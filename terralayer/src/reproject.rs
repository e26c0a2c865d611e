//! Reprojection of the elevation model onto the landscape vertex grid.
//!
//! Every vertex `(X, Y)` in `[-N, N)²` sits at local position
//! `(X · quad_size, Y · quad_size)`. The vertex is projected to its tile,
//! Lanczos-sampled and quantized against the model's global elevation range:
//!
//! ```text
//! q = round((sample - min) · 65535 / (max - min))
//! ```
//!
//! Vertices that cannot be resolved (projection failure, missing tile, or a
//! position too close to the tile edge for the kernel) get [`NO_DATA`].

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::coord::CoordinateProjector;
use crate::decode::ElevationRange;
use crate::model::{ElevationError, ElevationModel};
use crate::resample::sample_lanczos;
use crate::settings::{BuildSettings, GridLayout};

/// Quantized value of vertices without elevation data (mid-range).
pub const NO_DATA: u16 = 32768;

/// Landscape units per quad at a horizontal scale of 1.
pub const LANDSCAPE_SCALE_XY: f64 = 128.0;

/// Landscape units of height range at a vertical scale of 1.
pub const LANDSCAPE_SCALE_Z: f64 = 256.0;

/// Scene units (centimeters) per meter.
pub const METERS_TO_SCENE_UNITS: f64 = 100.0;

/// Height range multiplier applied internally by the landscape at Z scale 100.
pub const LANDSCAPE_INTERNAL_SCALE_Z: f64 = 512.0 / 100.0;

/// Maps a sample into the 16-bit range spanned by `range`.
///
/// A zero-width range maps everything to 0. Samples outside the range
/// saturate at the ends of the 16-bit range.
pub fn quantize(sample: f32, range: &ElevationRange) -> u16 {
    let span = f64::from(range.span());
    if span <= 0.0 {
        return 0;
    }
    let scaled = (f64::from(sample) - f64::from(range.min)) * (65535.0 / span);
    scaled.round() as u16
}

/// Affine scale mapping the quantized grid to scene units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BuildTransform {
    /// `[x, y, z]` scale.
    pub scale: [f64; 3],
}

impl BuildTransform {
    /// Computes the scale for a vertex spacing and elevation range.
    pub fn new(quad_size: f64, range: &ElevationRange) -> Self {
        let scale_xy = METERS_TO_SCENE_UNITS * quad_size / LANDSCAPE_SCALE_XY;
        let scale_z = f64::from(range.span()) / LANDSCAPE_SCALE_Z / LANDSCAPE_INTERNAL_SCALE_Z;
        Self {
            scale: [scale_xy, scale_xy, scale_z],
        }
    }

    /// Converts a vertex index and quantized height to scene units.
    pub fn to_scene(&self, x: i64, y: i64, height: u16) -> [f64; 3] {
        [
            x as f64 * LANDSCAPE_SCALE_XY * self.scale[0],
            y as f64 * LANDSCAPE_SCALE_XY * self.scale[1],
            (f64::from(height) - f64::from(NO_DATA)) / 128.0 * LANDSCAPE_SCALE_Z * self.scale[2],
        ]
    }
}

/// The quantized output grid, row-major from `(-N, -N)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heightmap {
    layout: GridLayout,
    data: Vec<u16>,
}

impl Heightmap {
    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    /// Side length in vertices.
    pub fn size(&self) -> u32 {
        self.layout.size()
    }

    pub fn data(&self) -> &[u16] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u16> {
        self.data
    }

    /// Height of vertex `(x, y)`, both in `[-N, N)`.
    pub fn get(&self, x: i64, y: i64) -> Option<u16> {
        self.layout.index(x, y).map(|i| self.data[i])
    }

    /// Raw little-endian 16-bit samples.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.data.iter().flat_map(|v| v.to_le_bytes()).collect()
    }
}

/// Callback receiving the completed fraction of rows.
pub type ReprojectProgressCallback = Box<dyn Fn(f64) + Send + Sync>;

/// Samples an [`ElevationModel`] onto the landscape grid.
pub struct Reprojector<'a> {
    projector: &'a CoordinateProjector,
    model: &'a ElevationModel,
    layout: GridLayout,
    quad_size: f64,
}

impl<'a> Reprojector<'a> {
    pub fn new(
        projector: &'a CoordinateProjector,
        model: &'a ElevationModel,
        settings: &BuildSettings,
    ) -> Result<Self, ElevationError> {
        Ok(Self {
            projector,
            model,
            layout: settings.layout()?,
            quad_size: settings.quad_size,
        })
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    /// Fills the whole grid and computes its transform.
    ///
    /// Rows are processed in parallel; each row checks `cancellation` before
    /// it starts and a cancelled run discards all output.
    pub fn reproject(
        &self,
        cancellation: &CancellationToken,
        on_progress: Option<&ReprojectProgressCallback>,
    ) -> Result<(Heightmap, BuildTransform), ElevationError> {
        let range = self.model.range();
        if !range.is_valid() {
            return Err(ElevationError::NoElevationRange);
        }

        let size = self.layout.size() as usize;
        let half = i64::from(self.layout.half_size);
        let mut data = vec![NO_DATA; self.layout.vertex_count()];
        let rows_done = AtomicUsize::new(0);

        info!(
            size,
            quad_size = self.quad_size,
            min = range.min,
            max = range.max,
            "Reprojecting elevation model"
        );

        data.par_chunks_mut(size)
            .enumerate()
            .try_for_each(|(row, out)| {
                if cancellation.is_cancelled() {
                    return Err(ElevationError::Cancelled);
                }

                let y = row as i64 - half;
                for (column, value) in out.iter_mut().enumerate() {
                    *value = self.sample_vertex(column as i64 - half, y, &range);
                }

                let done = rows_done.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(callback) = on_progress {
                    callback(done as f64 / size as f64);
                }
                Ok(())
            })?;

        let no_data = data.iter().filter(|&&v| v == NO_DATA).count();
        debug!(no_data, total = data.len(), "Reprojection finished");

        let transform = BuildTransform::new(self.quad_size, &range);
        Ok((
            Heightmap {
                layout: self.layout,
                data,
            },
            transform,
        ))
    }

    fn sample_vertex(&self, x: i64, y: i64, range: &ElevationRange) -> u16 {
        let local = [x as f64 * self.quad_size, y as f64 * self.quad_size];
        let Ok(address) = self.projector.local_to_pixel(local) else {
            return NO_DATA;
        };
        let Some(tile) = self.model.get_tile(&address.tile) else {
            return NO_DATA;
        };
        match sample_lanczos(tile.grid(), address.pixel_x, address.pixel_y) {
            Some(sample) => quantize(sample, range),
            None => NO_DATA,
        }
    }
}
