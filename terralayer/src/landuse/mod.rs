//! Land-use classification and material blend weights.
//!
//! Closed map ways tagged as land use, leisure or natural areas are mapped to
//! landscape weight layers by name:
//!
//! | Layer   | Ways                                                                 |
//! |---------|----------------------------------------------------------------------|
//! | `Grass` | landuse=grass, village_green, meadow, farmland; leisure=park         |
//! | `Wood`  | landuse=forest; natural=wood, nature_reserve                         |
//!
//! The first configured layer is the base layer and starts fully weighted.
//! Every later layer paints its polygons over the grid with a soft border of
//! `blend_gauge` meters and takes that weight away from the layers before it.

mod polygon;

pub use polygon::Polygon;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::coord::{geographic_to_local, GeoOrigin};
use crate::model::ElevationError;
use crate::settings::{BuildSettings, GridLayout};

/// Half gauges below this are treated as a hard polygon border.
const SMALL_NUMBER: f64 = 1e-8;

/// Errors while reading land-use input.
#[derive(Debug, Error)]
pub enum LandUseError {
    #[error("Failed to read land-use file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid land-use document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tag family of a map way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WayKind {
    #[serde(rename = "landuse")]
    LandUse,
    Leisure,
    Natural,
    #[serde(other)]
    Other,
}

/// A tagged map way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandUseWay {
    pub kind: WayKind,
    /// Tag value, e.g. `forest` for `landuse=forest`.
    pub category: String,
    pub points: Vec<[f64; 2]>,
}

impl LandUseWay {
    /// A way is closed when it has at least three distinct points and ends
    /// where it starts.
    pub fn is_closed(&self) -> bool {
        self.points.len() >= 4 && self.points.first() == self.points.last()
    }
}

/// Coordinate space of the points in a [`LandUseDocument`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSpace {
    /// Local-plane meters around the build origin.
    #[default]
    Local,
    /// `[longitude, latitude]` in degrees.
    Geographic,
}

/// Land-use input as read from JSON.
///
/// ```json
/// { "coordinates": "geographic",
///   "ways": [ { "kind": "landuse", "category": "forest",
///               "points": [[8.54, 47.37], [8.55, 47.37], [8.55, 47.38], [8.54, 47.37]] } ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandUseDocument {
    #[serde(default)]
    pub coordinates: CoordinateSpace,
    #[serde(default)]
    pub ways: Vec<LandUseWay>,
}

impl LandUseDocument {
    pub fn from_json(json: &str) -> Result<Self, LandUseError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, LandUseError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Returns the ways with points in local-plane meters.
    pub fn into_local(self, origin: &GeoOrigin) -> Vec<LandUseWay> {
        match self.coordinates {
            CoordinateSpace::Local => self.ways,
            CoordinateSpace::Geographic => self
                .ways
                .into_iter()
                .map(|way| LandUseWay {
                    points: way
                        .points
                        .iter()
                        .map(|p| geographic_to_local(origin, p[0], p[1]))
                        .collect(),
                    ..way
                })
                .collect(),
        }
    }
}

const GRASS_WAYS: &[(WayKind, &str)] = &[
    (WayKind::LandUse, "grass"),
    (WayKind::LandUse, "village_green"),
    (WayKind::LandUse, "meadow"),
    (WayKind::LandUse, "farmland"),
    (WayKind::Leisure, "park"),
];

const WOOD_WAYS: &[(WayKind, &str)] = &[
    (WayKind::LandUse, "forest"),
    (WayKind::Natural, "wood"),
    (WayKind::Natural, "nature_reserve"),
];

/// Way tags painted into a layer. Unknown layers match nothing.
pub fn layer_matches(layer: &str) -> &'static [(WayKind, &'static str)] {
    match layer {
        "Grass" => GRASS_WAYS,
        "Wood" => WOOD_WAYS,
        _ => &[],
    }
}

/// Closed ways belonging to a layer, as polygons.
pub fn polygons_for_layer(layer: &str, ways: &[LandUseWay]) -> Vec<Polygon> {
    let matches = layer_matches(layer);
    ways.iter()
        .filter(|way| way.is_closed())
        .filter(|way| {
            matches
                .iter()
                .any(|(kind, category)| way.kind == *kind && way.category == *category)
        })
        .filter_map(|way| Polygon::new(way.points.clone()))
        .collect()
}

/// 8-bit weights of one layer over the heightmap grid, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightLayer {
    pub name: String,
    pub data: Vec<u8>,
}

/// Callback receiving the completed fraction of blend weight painting.
pub type BlendProgressCallback = Box<dyn Fn(f64) + Send + Sync>;

/// Rasterizes the blend weights of every configured layer.
pub fn paint_blend_weights(
    settings: &BuildSettings,
    layout: &GridLayout,
    ways: &[LandUseWay],
    cancellation: &CancellationToken,
    on_progress: Option<&BlendProgressCallback>,
) -> Result<Vec<WeightLayer>, ElevationError> {
    let vertex_count = layout.vertex_count();
    let n = i64::from(layout.half_size);
    let quad = settings.quad_size;
    let half_gauge = settings.blend_gauge * 0.5;
    let half_gauge_sq = half_gauge * half_gauge;
    let painted_layers = settings.layers.len().saturating_sub(1).max(1) as f64;

    let mut layers: Vec<WeightLayer> = Vec::with_capacity(settings.layers.len());

    for (layer_index, name) in settings.layers.iter().enumerate() {
        if layer_index == 0 {
            layers.push(WeightLayer {
                name: name.clone(),
                data: vec![255; vertex_count],
            });
            continue;
        }

        let mut data = vec![0u8; vertex_count];
        let polygons = polygons_for_layer(name, ways);
        debug!(layer = %name, polygons = polygons.len(), "Painting blend weights");

        if polygons.is_empty() {
            // Keep the layer non-empty so consumers do not drop it
            if let Some(first) = data.first_mut() {
                *first = 1;
            }
        }

        for (polygon_index, polygon) in polygons.iter().enumerate() {
            let min = polygon.bounds_min();
            let max = polygon.bounds_max();
            let min_x = (((min[0] - half_gauge) / quad).floor() as i64).max(-n);
            let min_y = (((min[1] - half_gauge) / quad).floor() as i64).max(-n);
            let max_x = (((max[0] + half_gauge) / quad).ceil() as i64).min(n - 1);
            let max_y = (((max[1] + half_gauge) / quad).ceil() as i64).min(n - 1);

            for y in min_y..=max_y {
                for x in min_x..=max_x {
                    let location = [x as f64 * quad, y as f64 * quad];
                    let (square_distance, inside) = polygon.square_distance(location);
                    if !inside && square_distance >= half_gauge_sq {
                        continue;
                    }

                    let lerp = if half_gauge > SMALL_NUMBER {
                        square_distance.sqrt() / half_gauge * if inside { 0.5 } else { -0.5 } + 0.5
                    } else {
                        1.0
                    };
                    let weight = (255.0 * lerp).round().min(255.0) as u8;

                    let Some(index) = layout.index(x, y) else {
                        continue;
                    };
                    data[index] = weight;

                    let available = (255.0 - f64::from(weight)) / 255.0;
                    for previous in layers.iter_mut() {
                        previous.data[index] = (available * f64::from(previous.data[index])).round() as u8;
                    }
                }
            }

            if let Some(callback) = on_progress {
                let layer_share = (polygon_index + 1) as f64 / polygons.len() as f64;
                callback(((layer_index - 1) as f64 + layer_share) / painted_layers);
            }

            if cancellation.is_cancelled() {
                return Err(ElevationError::Cancelled);
            }
        }

        layers.push(WeightLayer {
            name: name.clone(),
            data,
        });

        if let Some(callback) = on_progress {
            callback(layer_index as f64 / painted_layers);
        }
    }

    info!(layers = layers.len(), ways = ways.len(), "Blend weights painted");
    Ok(layers)
}
