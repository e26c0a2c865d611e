//! End-to-end landscape builds against a synthetic tile server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use terralayer::cache::{DiskTileCache, MemoryTileCache};
use terralayer::coord::{CoordinateProjector, GeoOrigin};
use terralayer::decode::encode_terrarium;
use terralayer::fetch::{FetchConfig, TileFetcher};
use terralayer::landscape::{build_landscape, BuildPhase, BuildProgress, BuildProgressCallback};
use terralayer::landuse::{LandUseWay, WayKind};
use terralayer::model::ElevationError;
use terralayer::provider::{AsyncHttpClient, ProviderError};
use terralayer::reproject::{quantize, NO_DATA};
use terralayer::settings::BuildSettings;
use terralayer::source::TiledMapSource;

const TILE_SIZE: u32 = 256;

/// Serves flat tiles whose elevation depends on the tile position.
struct SyntheticTiles {
    fail_all: bool,
    fail_url: Option<String>,
    requests: AtomicUsize,
}

impl SyntheticTiles {
    fn new() -> Self {
        Self {
            fail_all: false,
            fail_url: None,
            requests: AtomicUsize::new(0),
        }
    }

    fn offline() -> Self {
        Self {
            fail_all: true,
            ..Self::new()
        }
    }

    fn elevation(x: u32, y: u32) -> f32 {
        100.0 + 10.0 * ((x + y) % 4) as f32
    }
}

impl AsyncHttpClient for SyntheticTiles {
    async fn get(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.fail_all || self.fail_url.as_deref() == Some(url) {
            return Err(ProviderError::HttpError("connection refused".to_string()));
        }

        let parts: Vec<u32> = url
            .trim_start_matches("mock://")
            .trim_end_matches(".png")
            .split('/')
            .filter_map(|p| p.parse().ok())
            .collect();
        let (x, y) = (parts[1], parts[2]);

        let samples = vec![Self::elevation(x, y); (TILE_SIZE * TILE_SIZE) as usize];
        encode_terrarium(TILE_SIZE, TILE_SIZE, &samples)
            .map_err(|e| ProviderError::HttpError(e.to_string()))
    }
}

fn source() -> TiledMapSource {
    TiledMapSource::new(TILE_SIZE, TILE_SIZE, 13, "mock://{zoom}/{x}/{y}.png").unwrap()
}

fn settings() -> BuildSettings {
    BuildSettings {
        quad_size: 10.0,
        radius: 300.0,
        blend_gauge: 20.0,
        layers: vec!["Ground".into(), "Grass".into(), "Wood".into()],
    }
}

fn origin() -> GeoOrigin {
    GeoOrigin::new(7.4474, 46.948).unwrap()
}

fn forest() -> Vec<LandUseWay> {
    vec![LandUseWay {
        kind: WayKind::LandUse,
        category: "forest".to_string(),
        points: vec![
            [-50.0, -50.0],
            [50.0, -50.0],
            [50.0, 50.0],
            [-50.0, 50.0],
            [-50.0, -50.0],
        ],
    }]
}

#[tokio::test]
async fn test_build_landscape_end_to_end() {
    let fetcher = TileFetcher::new(
        SyntheticTiles::new(),
        MemoryTileCache::new(),
        source(),
        FetchConfig::default(),
    );
    let settings = settings();

    let build = build_landscape(
        &settings,
        origin(),
        &fetcher,
        forest(),
        &CancellationToken::new(),
        None,
    )
    .await
    .unwrap();

    let layout = settings.layout().unwrap();
    assert_eq!(build.layout, layout);
    assert_eq!(build.heightmap.size(), layout.size());
    assert_eq!(build.heightmap.data().len(), layout.vertex_count());
    assert_eq!(build.lighting_lod, 0);
    assert_eq!(build.transform.scale[0], 100.0 * 10.0 / 128.0);

    let range = build.elevation_range;
    assert!(range.is_valid());
    assert!(range.min >= 100.0 && range.max <= 130.0);

    // Flat tiles resample to their own level, anything else is no-data
    let levels: Vec<u16> = [100.0, 110.0, 120.0, 130.0]
        .iter()
        .filter(|&&e| e >= range.min && e <= range.max)
        .map(|&e| quantize(e, &range))
        .collect();
    let mut sampled = 0;
    for &value in build.heightmap.data() {
        if value == NO_DATA {
            continue;
        }
        assert!(
            levels.iter().any(|&level| level.abs_diff(value) <= 1),
            "unexpected height {}",
            value
        );
        sampled += 1;
    }
    assert!(sampled > build.heightmap.data().len() / 2);

    let names: Vec<_> = build.weight_layers.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Ground", "Grass", "Wood"]);
    let center = layout.index(0, 0).unwrap();
    assert_eq!(build.weight_layers[2].data[center], 255);
    assert_eq!(build.weight_layers[0].data[center], 0);
    let corner = layout.index(-(layout.half_size as i64), -(layout.half_size as i64)).unwrap();
    assert_eq!(build.weight_layers[0].data[corner], 255);
}

#[tokio::test]
async fn test_disk_cache_serves_second_build() {
    let temp = TempDir::new().unwrap();
    let settings = settings();

    let online = TileFetcher::new(
        SyntheticTiles::new(),
        DiskTileCache::new(temp.path()),
        source(),
        FetchConfig::default(),
    );
    let first = build_landscape(
        &settings,
        origin(),
        &online,
        Vec::new(),
        &CancellationToken::new(),
        None,
    )
    .await
    .unwrap();
    let downloaded = online.client().requests.load(Ordering::SeqCst);
    assert!(downloaded > 0);

    let (files, _) = online.cache().stats().unwrap();
    assert_eq!(files, downloaded);

    let offline = TileFetcher::new(
        SyntheticTiles::offline(),
        DiskTileCache::new(temp.path()),
        source(),
        FetchConfig::default(),
    );
    let second = build_landscape(
        &settings,
        origin(),
        &offline,
        Vec::new(),
        &CancellationToken::new(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(offline.client().requests.load(Ordering::SeqCst), 0);
    assert_eq!(first.heightmap, second.heightmap);
    assert_eq!(first.transform, second.transform);
}

#[tokio::test]
async fn test_single_failed_tile_aborts_build() {
    let settings = settings();
    let source = source();

    // Fail exactly one of the tiles the build needs
    let projector = CoordinateProjector::new(origin(), &source);
    let half_extent = settings.layout().unwrap().half_extent(settings.quad_size);
    let needed = projector.select_tiles(half_extent).unwrap();
    let victim = needed.tiles().next().unwrap();

    let client = SyntheticTiles {
        fail_url: Some(source.tile_url(&victim)),
        ..SyntheticTiles::new()
    };
    let fetcher = TileFetcher::new(client, MemoryTileCache::new(), source, FetchConfig::default());

    let result = build_landscape(
        &settings,
        origin(),
        &fetcher,
        forest(),
        &CancellationToken::new(),
        None,
    )
    .await;

    match result {
        Err(ElevationError::DownloadIncomplete { failed, total }) => {
            assert!(failed >= 1);
            assert_eq!(total, needed.len());
        }
        other => panic!("expected download failure, got {:?}", other.map(|_| ())),
    }
    assert_eq!(fetcher.board().counts().pending(), 0);
}

#[tokio::test]
async fn test_cancelled_build() {
    let fetcher = TileFetcher::new(
        SyntheticTiles::new(),
        MemoryTileCache::new(),
        source(),
        FetchConfig::default(),
    );
    let token = CancellationToken::new();
    token.cancel();

    let result = build_landscape(&settings(), origin(), &fetcher, forest(), &token, None).await;

    assert!(matches!(result, Err(ElevationError::Cancelled)));
    assert_eq!(fetcher.client().requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_progress_covers_every_phase() {
    let fetcher = TileFetcher::new(
        SyntheticTiles::new(),
        MemoryTileCache::new(),
        source(),
        FetchConfig::default(),
    );
    let seen: Arc<parking_lot::Mutex<Vec<BuildProgress>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let callback: BuildProgressCallback =
        Arc::new(move |progress: BuildProgress| sink.lock().push(progress));

    build_landscape(
        &settings(),
        origin(),
        &fetcher,
        forest(),
        &CancellationToken::new(),
        Some(callback),
    )
    .await
    .unwrap();

    let seen = seen.lock();
    for phase in [
        BuildPhase::Downloading,
        BuildPhase::Reprojecting,
        BuildPhase::PaintingWeights,
    ] {
        let last = seen
            .iter()
            .filter(|p| p.phase == phase)
            .map(|p| p.fraction)
            .fold(0.0, f64::max);
        assert_eq!(last, 1.0, "phase {} did not finish", phase);
    }
    assert!(seen
        .iter()
        .filter(|p| p.phase == BuildPhase::Downloading)
        .all(|p| p.items.is_some()));
}
