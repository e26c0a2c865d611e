//! Terrarium elevation tile decoding.
//!
//! Elevation tiles are RGBA PNGs where each pixel packs one elevation sample:
//!
//! ```text
//! raw       = R * 256 + G + B / 256
//! elevation = raw - 32768            (meters, negative below sea level)
//! ```
//!
//! The alpha channel is ignored. A raw value is considered valid when it lies
//! strictly between 0 and 41768 (i.e. below ~9000 m). Invalid samples are
//! stored unmodified, without the offset, and are left out of the tile's
//! elevation range.

mod range;

pub use range::ElevationRange;

use image::{DynamicImage, ImageFormat};
use thiserror::Error;

/// Offset subtracted from valid raw values.
pub const TERRARIUM_OFFSET: f32 = 32768.0;

/// Exclusive upper bound for valid raw values.
pub const MAX_VALID_RAW: f32 = 41768.0;

/// Bytes per pixel of a supported tile.
const CHANNELS: usize = 4;

/// Errors that make a tile unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The bytes are not a readable PNG.
    #[error("Invalid image data: {0}")]
    InvalidImage(String),

    /// The tile does not have the source's tile dimensions.
    #[error("PNG file has wrong dimensions {actual_width}x{actual_height}. Expected {expected_width}x{expected_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// The tile is not 4-channel, 8 bits per channel.
    #[error("PNG file contains elevation data in an unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// A dense, row-major grid of elevation samples for one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationGrid {
    width: u32,
    height: u32,
    samples: Vec<f32>,
    range: ElevationRange,
}

impl ElevationGrid {
    /// Wraps pre-computed samples. `samples.len()` must equal `width * height`.
    pub fn from_samples(width: u32, height: u32, samples: Vec<f32>) -> Option<Self> {
        if samples.len() != width as usize * height as usize {
            return None;
        }
        let mut range = ElevationRange::empty();
        for &sample in &samples {
            range.include(sample);
        }
        Some(Self {
            width,
            height,
            samples,
            range,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Min/max over the valid samples of this tile.
    pub fn range(&self) -> ElevationRange {
        self.range
    }

    /// Sample at integer pixel coordinates, if inside the grid.
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.samples
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

/// Decodes an encoded elevation tile.
///
/// # Arguments
///
/// * `bytes` - PNG-encoded tile as fetched or cached
/// * `expected_width`, `expected_height` - Tile dimensions of the source
pub fn decode_elevation(
    bytes: &[u8],
    expected_width: u32,
    expected_height: u32,
) -> Result<ElevationGrid, DecodeError> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| DecodeError::InvalidImage(e.to_string()))?;

    if image.width() != expected_width || image.height() != expected_height {
        return Err(DecodeError::DimensionMismatch {
            expected_width,
            expected_height,
            actual_width: image.width(),
            actual_height: image.height(),
        });
    }

    match image {
        DynamicImage::ImageRgba8(buffer) => {
            decode_rgba(buffer.as_raw(), expected_width, expected_height)
        }
        other => Err(DecodeError::UnsupportedFormat(format!("{:?}", other.color()))),
    }
}

/// Decodes raw RGBA8 pixels into an elevation grid.
pub fn decode_rgba(pixels: &[u8], width: u32, height: u32) -> Result<ElevationGrid, DecodeError> {
    let pixel_count = width as usize * height as usize;
    if pixels.len() != pixel_count * CHANNELS {
        return Err(DecodeError::UnsupportedFormat(format!(
            "expected {} bytes of RGBA8 data, got {}",
            pixel_count * CHANNELS,
            pixels.len()
        )));
    }

    let mut samples = Vec::with_capacity(pixel_count);
    let mut range = ElevationRange::empty();

    for pixel in pixels.chunks_exact(CHANNELS) {
        let raw = pixel[0] as f32 * 256.0 + pixel[1] as f32 + pixel[2] as f32 / 256.0;
        if raw > 0.0 && raw < MAX_VALID_RAW {
            let elevation = raw - TERRARIUM_OFFSET;
            range.include(elevation);
            samples.push(elevation);
        } else {
            samples.push(raw);
        }
    }

    Ok(ElevationGrid {
        width,
        height,
        samples,
        range,
    })
}

/// Encodes elevations (meters) as a Terrarium RGBA PNG.
///
/// The inverse of [`decode_elevation`] for values inside the valid range.
/// Used to author synthetic tiles.
pub fn encode_terrarium(width: u32, height: u32, elevations: &[f32]) -> Result<Vec<u8>, DecodeError> {
    if elevations.len() != width as usize * height as usize {
        return Err(DecodeError::DimensionMismatch {
            expected_width: width,
            expected_height: height,
            actual_width: elevations.len() as u32,
            actual_height: 1,
        });
    }

    let mut pixels = Vec::with_capacity(elevations.len() * CHANNELS);
    for &elevation in elevations {
        let raw = (f64::from(elevation) + f64::from(TERRARIUM_OFFSET)).clamp(0.0, 65535.996);
        let whole = raw.floor();
        pixels.push((whole / 256.0).floor() as u8);
        pixels.push((whole % 256.0) as u8);
        pixels.push(((raw - whole) * 256.0).floor() as u8);
        pixels.push(u8::MAX);
    }

    let buffer = image::RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| DecodeError::InvalidImage("pixel buffer size mismatch".to_string()))?;
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(buffer)
        .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| DecodeError::InvalidImage(e.to_string()))?;
    Ok(bytes)
}
