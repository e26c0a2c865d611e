//! CLI error type and process exit handling.

use std::fmt;

use terralayer::config::ConfigError;
use terralayer::landuse::LandUseError;
use terralayer::model::ElevationError;
use terralayer::provider::ProviderError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded, saved or applied.
    Config(String),
    /// Logging could not be initialized.
    Logging(String),
    /// Land-use input could not be read.
    LandUse(String),
    /// The HTTP client could not be created.
    Http(String),
    /// The landscape build failed.
    Build(ElevationError),
    /// Writing build outputs failed.
    Output(String),
    /// The cache could not be cleared.
    CacheClear(String),
    /// Cache statistics could not be read.
    CacheStats(String),
}

impl CliError {
    /// Whether the user cancelled the build.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CliError::Build(e) if e.is_cancelled())
    }

    /// Process exit status for this error.
    ///
    /// A cancelled build exits with 130, like an interrupted shell command.
    pub fn exit_code(&self) -> i32 {
        if self.is_cancelled() {
            130
        } else {
            1
        }
    }

    /// Prints the error and exits the process. Cancellation exits silently.
    pub fn exit(&self) -> ! {
        if !self.is_cancelled() {
            eprintln!("Error: {}", self);
        }
        std::process::exit(self.exit_code());
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::LandUse(msg) => write!(f, "Failed to read land-use data: {}", msg),
            CliError::Http(msg) => write!(f, "Failed to create HTTP client: {}", msg),
            CliError::Build(ElevationError::Cancelled) => write!(f, "Build cancelled"),
            CliError::Build(e) => write!(f, "Build failed: {}", e),
            CliError::Output(msg) => write!(f, "Failed to write output: {}", msg),
            CliError::CacheClear(msg) => write!(f, "Failed to clear cache: {}", msg),
            CliError::CacheStats(msg) => write!(f, "Failed to read cache statistics: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LandUseError> for CliError {
    fn from(e: LandUseError) -> Self {
        CliError::LandUse(e.to_string())
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        CliError::Http(e.to_string())
    }
}

impl From<ElevationError> for CliError {
    fn from(e: ElevationError) -> Self {
        CliError::Build(e)
    }
}

impl From<image::ImageError> for CliError {
    fn from(e: image::ImageError) -> Self {
        CliError::Output(e.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Output(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_build_exits_quietly() {
        let err = CliError::from(ElevationError::Cancelled);
        assert!(err.is_cancelled());
        assert_eq!(err.exit_code(), 130);
    }

    #[test]
    fn test_failures_exit_with_one() {
        let err = CliError::from(ElevationError::NoElevationRange);
        assert!(!err.is_cancelled());
        assert_eq!(err.exit_code(), 1);
        assert_eq!(CliError::Config("bad".into()).exit_code(), 1);
    }

    #[test]
    fn test_download_failure_message() {
        let err = CliError::from(ElevationError::DownloadIncomplete { failed: 2, total: 9 });
        assert!(err
            .to_string()
            .contains("Could not download all necessary elevation model files"));
    }
}
