//! Fetch error types.

use thiserror::Error;

use crate::coord::TileCoord;
use crate::decode::DecodeError;
use crate::provider::ProviderError;

/// Why a single tile failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// The request did not complete within the timeout.
    #[error("Download of tile {tile} timed out after {timeout_secs}s")]
    Timeout { tile: TileCoord, timeout_secs: u64 },

    /// The transport reported a failure.
    #[error("Download of tile {tile} failed: {source}")]
    Transport {
        tile: TileCoord,
        #[source]
        source: ProviderError,
    },

    /// The fetched bytes are not a usable elevation tile.
    #[error("Tile {tile} could not be decoded: {source}")]
    Decode {
        tile: TileCoord,
        #[source]
        source: DecodeError,
    },

    /// The fetch was cancelled before reaching a result.
    #[error("Download of tile {tile} was cancelled")]
    Cancelled { tile: TileCoord },
}

impl FetchError {
    /// The tile this error belongs to.
    pub fn tile(&self) -> TileCoord {
        match self {
            FetchError::Timeout { tile, .. }
            | FetchError::Transport { tile, .. }
            | FetchError::Decode { tile, .. }
            | FetchError::Cancelled { tile } => *tile,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled { .. })
    }
}

/// Why a whole batch failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BatchError {
    /// The caller cancelled the batch.
    #[error("Tile download was cancelled")]
    Cancelled,

    /// At least one tile failed; every sibling was cancelled.
    #[error("{failed} of {total} tiles could not be downloaded (first failure: {first})")]
    Incomplete {
        failed: usize,
        total: usize,
        first: FetchError,
    },
}
