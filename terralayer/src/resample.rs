//! Lanczos resampling of elevation grids.
//!
//! Elevation tiles are sampled at arbitrary sub-pixel positions. A radius-3
//! Lanczos kernel evaluated on the Euclidean distance to each tap gives a
//! smooth, low-ringing estimate. Only the 13 taps of the 5×5 neighbourhood
//! that fall inside the circular kernel support are used:
//!
//! ```text
//!         . . X . .
//!         . X X X .
//!         X X O X X
//!         . X X X .
//!         . . X . .
//! ```

use std::f64::consts::PI;

use crate::decode::ElevationGrid;

/// Window radius of the Lanczos kernel.
pub const LANCZOS_FILTER_SIZE: f64 = 3.0;

/// Tap offsets, relative to the integer part of the sample position.
pub const LANCZOS_TAPS: [(i32, i32); 13] = [
    (0, -2),
    (-1, -1),
    (0, -1),
    (1, -1),
    (-2, 0),
    (-1, 0),
    (0, 0),
    (1, 0),
    (2, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (0, 2),
];

/// Distance below which the kernel is treated as its limit value 1.
const SINGULARITY_EPSILON: f64 = 0.0001;

/// Evaluates the radius-3 Lanczos kernel at `x`.
///
/// `L(x) = 3 · sin(πx) · sin(πx/3) / (πx)²`, with `L(0) = 1`. Callers only
/// evaluate it inside the window, so no cutoff is applied.
#[inline]
pub fn lanczos(x: f64) -> f64 {
    if x > -SINGULARITY_EPSILON && x < SINGULARITY_EPSILON {
        return 1.0;
    }
    let xpi = x * PI;
    LANCZOS_FILTER_SIZE * xpi.sin() * (xpi / LANCZOS_FILTER_SIZE).sin() / (xpi * xpi)
}

/// Whether a sample position keeps the whole tap footprint inside the grid.
///
/// Requires a 2-pixel margin on the low side and 3 pixels on the high side.
#[inline]
pub fn can_sample_lanczos(pixel_x: f64, pixel_y: f64, width: u32, height: u32) -> bool {
    pixel_x >= 2.0
        && pixel_y >= 2.0
        && pixel_x < width as f64 - 3.0
        && pixel_y < height as f64 - 3.0
}

/// Samples the grid at a sub-pixel position with the Lanczos kernel.
///
/// Returns the kernel-weighted average of the 13 taps, or `None` when the
/// position violates [`can_sample_lanczos`].
pub fn sample_lanczos(grid: &ElevationGrid, pixel_x: f64, pixel_y: f64) -> Option<f32> {
    let width = grid.width();
    if !can_sample_lanczos(pixel_x, pixel_y, width, grid.height()) {
        return None;
    }

    let base_x = pixel_x as i64;
    let base_y = pixel_y as i64;
    let frac_x = pixel_x - base_x as f64;
    let frac_y = pixel_y - base_y as f64;
    let samples = grid.samples();

    let mut value = 0.0f64;
    let mut weight_sum = 0.0f64;
    for &(tap_x, tap_y) in &LANCZOS_TAPS {
        let dx = frac_x - tap_x as f64;
        let dy = frac_y - tap_y as f64;
        let weight = lanczos((dx * dx + dy * dy).sqrt());

        let index = (base_y + tap_y as i64) as usize * width as usize + (base_x + tap_x as i64) as usize;
        value += samples[index] as f64 * weight;
        weight_sum += weight;
    }

    Some((value / weight_sum) as f32)
}

/// Samples the pixel containing the position, without interpolation.
pub fn sample_nearest(grid: &ElevationGrid, pixel_x: f64, pixel_y: f64) -> Option<f32> {
    if pixel_x < 0.0 || pixel_y < 0.0 {
        return None;
    }
    grid.get(pixel_x as u32, pixel_y as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn constant_grid(size: u32, value: f32) -> ElevationGrid {
        ElevationGrid::from_samples(size, size, vec![value; (size * size) as usize]).unwrap()
    }

    fn ramp_grid(size: u32) -> ElevationGrid {
        let samples = (0..size * size).map(|i| (i % size) as f32).collect();
        ElevationGrid::from_samples(size, size, samples).unwrap()
    }

    #[test]
    fn test_lanczos_at_origin() {
        assert_eq!(lanczos(0.0), 1.0);
        assert_eq!(lanczos(0.00005), 1.0);
    }

    #[test]
    fn test_lanczos_zero_crossings() {
        for x in [1.0, 2.0, -1.0, -2.0] {
            assert!(lanczos(x).abs() < 1e-12, "L({}) = {}", x, lanczos(x));
        }
    }

    #[test]
    fn test_lanczos_is_symmetric() {
        for x in [0.25, 0.5, 1.5, 2.75] {
            assert!((lanczos(x) - lanczos(-x)).abs() < 1e-15);
        }
    }

    #[test]
    fn test_sample_at_integer_position_returns_pixel() {
        let grid = ramp_grid(16);
        let value = sample_lanczos(&grid, 7.0, 9.0).unwrap();
        assert!((value - 7.0).abs() < 1e-5);
    }

    #[test]
    fn test_sample_lanczos_interpolates_between_pixels() {
        let grid = ramp_grid(16);
        let value = sample_lanczos(&grid, 7.5, 8.0).unwrap();
        assert!(value > 7.0 && value < 8.0, "got {}", value);
    }

    #[test]
    fn test_sample_lanczos_edge_precondition() {
        let grid = constant_grid(16, 1.0);
        assert!(sample_lanczos(&grid, 1.99, 8.0).is_none());
        assert!(sample_lanczos(&grid, 8.0, 1.99).is_none());
        assert!(sample_lanczos(&grid, 13.0, 8.0).is_none());
        assert!(sample_lanczos(&grid, 8.0, 13.0).is_none());
        assert!(sample_lanczos(&grid, 2.0, 12.99).is_some());
    }

    #[test]
    fn test_sample_nearest() {
        let grid = ramp_grid(8);
        assert_eq!(sample_nearest(&grid, 3.9, 0.2), Some(3.0));
        assert_eq!(sample_nearest(&grid, 8.0, 0.0), None);
        assert_eq!(sample_nearest(&grid, -0.5, 0.0), None);
    }

    proptest! {
        #[test]
        fn prop_constant_grid_is_reproduced_exactly(
            k in -500.0f32..9000.0,
            x in 2.0f64..12.999,
            y in 2.0f64..12.999,
        ) {
            let grid = constant_grid(16, k);
            prop_assert_eq!(sample_lanczos(&grid, x, y), Some(k));
        }
    }
}
