//! Closed 2D polygons in local-plane meters.

/// A closed polygon with cached bounds.
///
/// The last point connects back to the first; a repeated closing point is
/// allowed and contributes a zero-length edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    points: Vec<[f64; 2]>,
    bounds_min: [f64; 2],
    bounds_max: [f64; 2],
}

impl Polygon {
    /// Creates a polygon. Returns `None` for fewer than three points.
    pub fn new(points: Vec<[f64; 2]>) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let mut bounds_min = [f64::MAX; 2];
        let mut bounds_max = [f64::MIN; 2];
        for p in &points {
            bounds_min[0] = bounds_min[0].min(p[0]);
            bounds_min[1] = bounds_min[1].min(p[1]);
            bounds_max[0] = bounds_max[0].max(p[0]);
            bounds_max[1] = bounds_max[1].max(p[1]);
        }
        Some(Self {
            points,
            bounds_min,
            bounds_max,
        })
    }

    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    pub fn bounds_min(&self) -> [f64; 2] {
        self.bounds_min
    }

    pub fn bounds_max(&self) -> [f64; 2] {
        self.bounds_max
    }

    /// Squared distance from `point` to the polygon outline, and whether the
    /// point lies inside (even-odd rule).
    pub fn square_distance(&self, point: [f64; 2]) -> (f64, bool) {
        let mut inside = false;
        let mut best = f64::MAX;

        let n = self.points.len();
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];

            if (a[1] > point[1]) != (b[1] > point[1]) {
                let t = (point[1] - a[1]) / (b[1] - a[1]);
                if point[0] < a[0] + t * (b[0] - a[0]) {
                    inside = !inside;
                }
            }

            best = best.min(segment_square_distance(point, a, b));
        }

        (best, inside)
    }
}

fn segment_square_distance(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let ab = [b[0] - a[0], b[1] - a[1]];
    let ap = [p[0] - a[0], p[1] - a[1]];
    let len_sq = ab[0] * ab[0] + ab[1] * ab[1];
    let t = if len_sq > 0.0 {
        ((ap[0] * ab[0] + ap[1] * ab[1]) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let dx = ap[0] - t * ab[0];
    let dy = ap[1] - t * ab[1];
    dx * dx + dy * dy
}
