//! Session-level errors of an elevation import.

use thiserror::Error;

use crate::coord::CoordError;
use crate::settings::SettingsError;

/// Why an elevation import could not produce a heightmap.
///
/// Individual tile failures never surface here; they collapse into
/// [`ElevationError::DownloadIncomplete`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElevationError {
    /// The build settings are unusable.
    #[error("Invalid build settings: {0}")]
    InvalidSettings(#[from] SettingsError),

    /// The requested area leaves the Web Mercator plane.
    #[error("Chosen elevation bounds are invalid. Stay within WebMercator bounds!")]
    BoundsInvalid(#[source] CoordError),

    /// At least one required tile could not be fetched.
    #[error("Could not download all necessary elevation model files ({failed} of {total} failed). See log for details!")]
    DownloadIncomplete { failed: usize, total: usize },

    /// No fetched tile contained a single valid sample.
    #[error("Elevation model contains no valid elevation samples")]
    NoElevationRange,

    /// A background build step panicked.
    #[error("Build task panicked: {0}")]
    TaskFailed(String),

    /// The caller cancelled the import.
    #[error("Elevation import cancelled")]
    Cancelled,
}

impl ElevationError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ElevationError::Cancelled)
    }
}
