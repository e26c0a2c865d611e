//! Provider error types.

use thiserror::Error;

/// Errors raised by the tile transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The request could not be completed (connection, TLS, body read).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The HTTP client could not be constructed.
    #[error("Failed to create HTTP client: {0}")]
    ClientCreation(String),
}
