//! Concurrent elevation tile fetching.
//!
//! The [`TileFetcher`] resolves a batch of tiles into decoded rasters. Each
//! tile is looked up in the [`TileCache`] first; misses are downloaded through
//! the injected [`AsyncHttpClient`] under a shared [`ConcurrencyLimiter`] and a
//! per-request timeout, decoded, and written back to the cache.
//!
//! # Failure handling
//!
//! The first tile that fails (timeout, transport error, undecodable bytes)
//! cancels every sibling in the batch, so nothing keeps downloading for a
//! result that can no longer be used. The batch then reports
//! [`BatchError::Incomplete`]. Cancelling the caller's token ends the batch
//! with [`BatchError::Cancelled`].
//!
//! # Observability
//!
//! Every batch gets its own [`FetchBoard`] publishing the per-tile lifecycle,
//! and a [`FetchProgress`] callback fires after every finished tile. Batches
//! may overlap on one fetcher; [`TileFetcher::board`] shows the most
//! recently started one.

mod board;
mod error;
mod limiter;

pub use board::{FetchBoard, FetchCounts, FetchState};
pub use error::{BatchError, FetchError};
pub use limiter::{ConcurrencyLimiter, LimiterPermit, DEFAULT_MAX_CONCURRENT_REQUESTS};

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::TileCache;
use crate::coord::TileCoord;
use crate::decode::{decode_elevation, DecodeError, ElevationGrid};
use crate::model::RasterTile;
use crate::provider::AsyncHttpClient;
use crate::source::TiledMapSource;

/// Default wall-clock limit for one tile request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Tunables for a [`TileFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Maximum simultaneous network requests.
    pub max_concurrent_requests: usize,
    /// Time a single request may take before it counts as failed.
    pub request_timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Progress of a running batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchProgress {
    /// Tiles that reached a terminal state.
    pub completed: usize,
    /// Of those, tiles that succeeded.
    pub succeeded: usize,
    /// Tiles in the batch.
    pub total: usize,
}

impl FetchProgress {
    /// Completed share of the batch in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Callback invoked after each finished tile.
pub type FetchProgressCallback = Box<dyn Fn(FetchProgress) + Send + Sync>;

/// Fetches and decodes elevation tiles with caching and bounded concurrency.
pub struct TileFetcher<C, K> {
    client: C,
    cache: K,
    source: TiledMapSource,
    limiter: Arc<ConcurrencyLimiter>,
    config: FetchConfig,
    board: Mutex<Arc<FetchBoard>>,
}

impl<C, K> TileFetcher<C, K>
where
    C: AsyncHttpClient,
    K: TileCache,
{
    /// Creates a fetcher with its own limiter sized from `config`.
    pub fn new(client: C, cache: K, source: TiledMapSource, config: FetchConfig) -> Self {
        let limiter = Arc::new(ConcurrencyLimiter::new(
            config.max_concurrent_requests,
            "elevation",
        ));
        Self::with_limiter(client, cache, source, config, limiter)
    }

    /// Creates a fetcher sharing an existing limiter.
    ///
    /// Several fetchers built on the same limiter never exceed its ceiling
    /// together.
    pub fn with_limiter(
        client: C,
        cache: K,
        source: TiledMapSource,
        config: FetchConfig,
        limiter: Arc<ConcurrencyLimiter>,
    ) -> Self {
        Self {
            client,
            cache,
            source,
            limiter,
            config,
            board: Mutex::new(Arc::new(FetchBoard::new())),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn source(&self) -> &TiledMapSource {
        &self.source
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn limiter(&self) -> &Arc<ConcurrencyLimiter> {
        &self.limiter
    }

    /// Per-tile state of the most recently started batch.
    pub fn board(&self) -> Arc<FetchBoard> {
        self.board.lock().clone()
    }

    pub fn cache(&self) -> &K {
        &self.cache
    }

    /// Fetches every tile of the batch.
    ///
    /// Returns the decoded tiles sorted by coordinate. Fails as soon as one
    /// tile fails; the remaining tiles are cancelled and drained before
    /// returning, so no request outlives the call.
    pub async fn fetch_all(
        &self,
        tiles: &[TileCoord],
        cancellation: &CancellationToken,
        on_progress: Option<&FetchProgressCallback>,
    ) -> Result<Vec<RasterTile>, BatchError> {
        let total = tiles.len();
        let board = Arc::new(FetchBoard::for_batch(tiles));
        *self.board.lock() = Arc::clone(&board);

        if total == 0 {
            return Ok(Vec::new());
        }

        info!(
            total,
            max_concurrent = self.limiter.max_concurrent(),
            timeout_secs = self.config.request_timeout.as_secs(),
            "Fetching elevation tiles"
        );

        let batch = cancellation.child_token();
        let mut pending: FuturesUnordered<_> = tiles
            .iter()
            .map(|&tile| {
                let (batch, board) = (&batch, &board);
                async move { (tile, self.fetch_one(tile, batch, board).await) }
            })
            .collect();

        let mut fetched = Vec::with_capacity(total);
        let mut failed = 0usize;
        let mut first_error: Option<FetchError> = None;
        let mut completed = 0usize;

        while let Some((tile, result)) = pending.next().await {
            completed += 1;
            match result {
                Ok(raster) => {
                    board.set(tile, FetchState::Succeeded);
                    fetched.push(raster);
                }
                Err(error) => {
                    board.set(tile, FetchState::Failed);
                    failed += 1;
                    if error.is_cancelled() {
                        first_error.get_or_insert(error);
                    } else {
                        if !batch.is_cancelled() {
                            warn!(tile = %tile, error = %error, "Cancelling remaining tile downloads");
                            batch.cancel();
                        }
                        // A real failure outranks the cancellations it caused
                        if first_error.as_ref().map_or(true, FetchError::is_cancelled) {
                            first_error = Some(error);
                        }
                    }
                }
            }

            if let Some(callback) = on_progress {
                callback(FetchProgress {
                    completed,
                    succeeded: fetched.len(),
                    total,
                });
            }
        }

        match first_error {
            None => {
                fetched.sort_by_key(RasterTile::coord);
                info!(total, "Elevation tiles fetched");
                Ok(fetched)
            }
            Some(_) if cancellation.is_cancelled() => {
                info!(completed = fetched.len(), total, "Elevation tile fetch cancelled");
                Err(BatchError::Cancelled)
            }
            Some(first) => Err(BatchError::Incomplete {
                failed,
                total,
                first,
            }),
        }
    }

    async fn fetch_one(
        &self,
        tile: TileCoord,
        cancellation: &CancellationToken,
        board: &FetchBoard,
    ) -> Result<RasterTile, FetchError> {
        if cancellation.is_cancelled() {
            return Err(FetchError::Cancelled { tile });
        }

        if let Some(bytes) = self.cache.try_load(tile).await {
            board.set(tile, FetchState::Decoding);
            match self.decode(&bytes) {
                Ok(grid) => {
                    debug!(tile = %tile, "Elevation tile served from cache");
                    return Ok(RasterTile::new(tile, grid));
                }
                Err(error) => {
                    warn!(tile = %tile, error = %error, "Cached elevation tile is unreadable, downloading again");
                    board.set(tile, FetchState::NotStarted);
                }
            }
        }

        let permit = tokio::select! {
            biased;
            _ = cancellation.cancelled() => return Err(FetchError::Cancelled { tile }),
            permit = self.limiter.acquire() => permit,
        };

        board.set(tile, FetchState::Requesting);
        let url = self.source.tile_url(&tile);
        debug!(tile = %tile, url = %url, "Requesting elevation tile");

        let response = tokio::select! {
            biased;
            _ = cancellation.cancelled() => return Err(FetchError::Cancelled { tile }),
            response = tokio::time::timeout(self.config.request_timeout, self.client.get(&url)) => response,
        };
        drop(permit);

        let bytes = match response {
            Err(_) => {
                warn!(tile = %tile, "Download time-out. Check your internet connection!");
                return Err(FetchError::Timeout {
                    tile,
                    timeout_secs: self.config.request_timeout.as_secs(),
                });
            }
            Ok(Err(source)) => {
                warn!(tile = %tile, error = %source, "Download connection failure. Check your internet connection!");
                return Err(FetchError::Transport { tile, source });
            }
            Ok(Ok(bytes)) => bytes,
        };

        board.set(tile, FetchState::Decoding);
        let grid = self.decode(&bytes).map_err(|source| {
            warn!(tile = %tile, error = %source, "Downloaded elevation tile is unusable");
            FetchError::Decode { tile, source }
        })?;

        self.cache.save(tile, bytes).await;
        Ok(RasterTile::new(tile, grid))
    }

    fn decode(&self, bytes: &[u8]) -> Result<ElevationGrid, DecodeError> {
        decode_elevation(bytes, self.source.tile_width(), self.source.tile_height())
    }
}
