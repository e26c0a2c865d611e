//! Elevation min/max tracking.

/// Running min/max of valid elevation samples.
///
/// An empty range has `min > max` and is not [`valid`](Self::is_valid).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationRange {
    pub min: f32,
    pub max: f32,
}

impl ElevationRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// A range containing no samples yet.
    pub fn empty() -> Self {
        Self {
            min: f32::MAX,
            max: f32::MIN,
        }
    }

    /// Extends the range to include `value`.
    pub fn include(&mut self, value: f32) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Extends the range to cover `other` as well.
    pub fn union(&mut self, other: &ElevationRange) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Whether at least one sample has been included.
    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }

    /// Difference between max and min.
    pub fn span(&self) -> f32 {
        self.max - self.min
    }
}

impl Default for ElevationRange {
    fn default() -> Self {
        Self::empty()
    }
}
