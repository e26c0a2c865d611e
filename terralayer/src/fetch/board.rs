//! Per-tile fetch state, observable while a batch runs.

use dashmap::DashMap;

use crate::coord::TileCoord;

/// Lifecycle of a single tile fetch.
///
/// ```text
/// NotStarted ─┬─(cache hit)──► Decoding ─┬─► Succeeded
///             └─(cache miss)─► Requesting ─► Decoding ─┘
///                        any state ───────────────────────► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchState {
    NotStarted,
    Requesting,
    Decoding,
    Succeeded,
    Failed,
}

impl FetchState {
    /// Whether the state is final.
    pub fn is_terminal(self) -> bool {
        matches!(self, FetchState::Succeeded | FetchState::Failed)
    }
}

/// Snapshot of how many tiles are in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchCounts {
    pub not_started: usize,
    pub requesting: usize,
    pub decoding: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl FetchCounts {
    pub fn total(&self) -> usize {
        self.not_started + self.requesting + self.decoding + self.succeeded + self.failed
    }

    /// Tiles that have not reached a terminal state.
    pub fn pending(&self) -> usize {
        self.not_started + self.requesting + self.decoding
    }
}

/// Shared map of tile → fetch state for one batch.
#[derive(Debug, Default)]
pub struct FetchBoard {
    states: DashMap<TileCoord, FetchState>,
}

impl FetchBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A board with every tile of a batch registered as not started.
    pub fn for_batch(tiles: &[TileCoord]) -> Self {
        let board = Self::new();
        for tile in tiles {
            board.states.insert(*tile, FetchState::NotStarted);
        }
        board
    }

    pub fn set(&self, tile: TileCoord, state: FetchState) {
        self.states.insert(tile, state);
    }

    pub fn state(&self, tile: &TileCoord) -> Option<FetchState> {
        self.states.get(tile).map(|entry| *entry.value())
    }

    pub fn counts(&self) -> FetchCounts {
        let mut counts = FetchCounts::default();
        for entry in self.states.iter() {
            match entry.value() {
                FetchState::NotStarted => counts.not_started += 1,
                FetchState::Requesting => counts.requesting += 1,
                FetchState::Decoding => counts.decoding += 1,
                FetchState::Succeeded => counts.succeeded += 1,
                FetchState::Failed => counts.failed += 1,
            }
        }
        counts
    }
}
