//! Landscape build settings and the output grid layout derived from them.

use thiserror::Error;

/// Default spacing between heightmap vertices, in meters.
pub const DEFAULT_QUAD_SIZE: f64 = 5.0;

/// Default radius of the generated landscape, in meters.
pub const DEFAULT_RADIUS: f64 = 2_000.0;

/// Default width of the blend transition at land-use borders, in meters.
pub const DEFAULT_BLEND_GAUGE: f64 = 2.0;

/// Default weight layers. The first is the base layer.
pub const DEFAULT_LAYERS: &[&str] = &["Ground", "Grass", "Wood"];

/// Largest supported vertex count from center to edge, before rounding up to
/// whole subsections.
pub const MAX_GRID_HALF_SIZE: u32 = 8192;

/// Errors for unusable build settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("Quad size must be positive, got {0}")]
    InvalidQuadSize(f64),

    #[error("Radius must be positive, got {0}")]
    InvalidRadius(f64),

    #[error("Blend gauge must not be negative, got {0}")]
    InvalidBlendGauge(f64),

    #[error(
        "Radius {radius} m at quad size {quad_size} m exceeds {max} vertices from center to edge"
    )]
    GridTooLarge { radius: f64, quad_size: f64, max: u32 },
}

/// Read-only parameters of one landscape build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSettings {
    /// Distance between neighbouring vertices, in meters.
    pub quad_size: f64,
    /// Requested half side length of the landscape, in meters.
    pub radius: f64,
    /// Width of the soft border painted around land-use polygons, in meters.
    pub blend_gauge: f64,
    /// Weight layer names, base layer first.
    pub layers: Vec<String>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            quad_size: DEFAULT_QUAD_SIZE,
            radius: DEFAULT_RADIUS,
            blend_gauge: DEFAULT_BLEND_GAUGE,
            layers: DEFAULT_LAYERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl BuildSettings {
    /// Checks that the settings describe a buildable landscape.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.quad_size.is_finite() && self.quad_size > 0.0) {
            return Err(SettingsError::InvalidQuadSize(self.quad_size));
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(SettingsError::InvalidRadius(self.radius));
        }
        if !(self.blend_gauge.is_finite() && self.blend_gauge >= 0.0) {
            return Err(SettingsError::InvalidBlendGauge(self.blend_gauge));
        }
        GridLayout::new(self.radius, self.quad_size)?;
        Ok(())
    }

    /// Grid layout for these settings.
    pub fn layout(&self) -> Result<GridLayout, SettingsError> {
        self.validate()?;
        GridLayout::new(self.radius, self.quad_size)
    }
}

/// Vertex layout of the square output heightmap.
///
/// The grid spans vertex indices `[-half_size, half_size)` on both axes, so
/// its side length is always even and a multiple of the subsection size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    /// Vertices from the center to the edge (N).
    pub half_size: u32,
    /// Quads per landscape subsection.
    pub subsection_size_quads: u32,
}

impl GridLayout {
    /// Derives the layout for a radius and vertex spacing (both in meters).
    ///
    /// The vertex count for the radius is rounded up to a whole number of
    /// subsections, where the subsection size is one less than a sixteenth of
    /// the next power of two. Fails when the radius needs more than
    /// [`MAX_GRID_HALF_SIZE`] vertices from center to edge.
    pub fn new(radius: f64, quad_size: f64) -> Result<Self, SettingsError> {
        let too_large = || SettingsError::GridTooLarge {
            radius,
            quad_size,
            max: MAX_GRID_HALF_SIZE,
        };

        let vertices = (radius / quad_size).round();
        if !vertices.is_finite() || vertices > f64::from(MAX_GRID_HALF_SIZE) {
            return Err(too_large());
        }

        let size = (vertices as u32).max(1);
        let subsection_size_quads = size
            .checked_next_power_of_two()
            .map(|p| (p / 16).saturating_sub(1).max(1))
            .ok_or_else(too_large)?;
        let half_size = size
            .div_ceil(subsection_size_quads)
            .checked_mul(subsection_size_quads)
            .ok_or_else(too_large)?;

        Ok(Self {
            half_size,
            subsection_size_quads,
        })
    }

    /// Side length of the grid in vertices (2N).
    pub fn size(&self) -> u32 {
        self.half_size * 2
    }

    /// Number of vertices in the grid.
    pub fn vertex_count(&self) -> usize {
        let size = self.size() as usize;
        size * size
    }

    /// Row-major index of vertex `(x, y)`, both in `[-N, N)`.
    pub fn index(&self, x: i64, y: i64) -> Option<usize> {
        let n = i64::from(self.half_size);
        if !(-n..n).contains(&x) || !(-n..n).contains(&y) {
            return None;
        }
        Some(((y + n) * 2 * n + (x + n)) as usize)
    }

    /// Static lighting level of detail that keeps light baking tractable.
    ///
    /// ```text
    ///  < 2048²  -> 0
    /// >= 2048²  -> 1
    /// >= 4096²  -> 2
    /// >= 8192²  -> 3
    /// ```
    pub fn lighting_lod(&self) -> u32 {
        let size = u64::from(self.size());
        let blocks = size * size / (2048 * 2048) + 1;
        let log2 = u64::BITS - (blocks - 1).leading_zeros();
        log2.div_ceil(2)
    }

    /// Half side length of the covered area in meters.
    pub fn half_extent(&self, quad_size: f64) -> f64 {
        f64::from(self.half_size) * quad_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_for_one_thousand_vertices() {
        let layout = GridLayout::new(5_000.0, 5.0).unwrap();
        assert_eq!(layout.subsection_size_quads, 63);
        assert_eq!(layout.half_size, 1008);
        assert_eq!(layout.size(), 2016);
    }

    #[test]
    fn test_layout_is_even_and_subdivides() {
        for (radius, quad) in [(1.0, 5.0), (333.0, 1.0), (12_345.0, 2.5), (40.0, 1.0)] {
            let layout = GridLayout::new(radius, quad).unwrap();
            assert_eq!(layout.size() % 2, 0);
            assert_eq!(layout.half_size % layout.subsection_size_quads, 0);
            assert!(layout.half_size as f64 >= (radius / quad).round());
        }
    }

    #[test]
    fn test_tiny_radius_keeps_one_vertex() {
        let layout = GridLayout::new(1.0, 10.0).unwrap();
        assert_eq!(layout.half_size, 1);
        assert_eq!(layout.subsection_size_quads, 1);
    }

    #[test]
    fn test_index_bounds() {
        let layout = GridLayout::new(4.0, 1.0).unwrap();
        let n = layout.half_size as i64;
        assert_eq!(layout.index(-n, -n), Some(0));
        assert_eq!(layout.index(n - 1, n - 1), Some(layout.vertex_count() - 1));
        assert_eq!(layout.index(n, 0), None);
        assert_eq!(layout.index(0, -n - 1), None);
    }

    #[test]
    fn test_lighting_lod() {
        let lod = |half_size| {
            GridLayout {
                half_size,
                subsection_size_quads: 1,
            }
            .lighting_lod()
        };
        assert_eq!(lod(1008), 0);
        assert_eq!(lod(1024), 1);
        assert_eq!(lod(2048), 2);
        assert_eq!(lod(4096), 3);
    }

    #[test]
    fn test_validate() {
        assert!(BuildSettings::default().validate().is_ok());

        let settings = BuildSettings {
            quad_size: 0.0,
            ..BuildSettings::default()
        };
        assert_eq!(settings.validate(), Err(SettingsError::InvalidQuadSize(0.0)));

        let settings = BuildSettings {
            radius: f64::NAN,
            ..BuildSettings::default()
        };
        assert!(matches!(settings.layout(), Err(SettingsError::InvalidRadius(_))));
    }

    #[test]
    fn test_huge_radius_is_rejected() {
        let settings = BuildSettings {
            radius: 3.0e9,
            quad_size: 1.0,
            ..BuildSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::GridTooLarge { max: MAX_GRID_HALF_SIZE, .. })
        ));
        assert!(matches!(
            settings.layout(),
            Err(SettingsError::GridTooLarge { .. })
        ));
    }

    #[test]
    fn test_largest_grid_is_accepted() {
        let layout = GridLayout::new(f64::from(MAX_GRID_HALF_SIZE), 1.0).unwrap();
        assert_eq!(layout.subsection_size_quads, 511);
        assert_eq!(layout.half_size, 17 * 511);
        assert_eq!(layout.lighting_lod(), 4);
        assert!(GridLayout::new(f64::from(MAX_GRID_HALF_SIZE) + 1.0, 1.0).is_err());
    }
}
