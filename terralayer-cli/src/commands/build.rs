//! Build command - import elevation and land use around an origin.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{GrayImage, ImageBuffer, Luma};
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use terralayer::cache::{DiskTileCache, MemoryTileCache, TileCache};
use terralayer::config::ConfigFile;
use terralayer::coord::GeoOrigin;
use terralayer::fetch::TileFetcher;
use terralayer::landscape::{
    build_landscape, BuildPhase, BuildProgress, BuildProgressCallback, LandscapeBuild,
};
use terralayer::landuse::{LandUseDocument, LandUseWay, WeightLayer};
use terralayer::provider::AsyncReqwestClient;
use terralayer::settings::BuildSettings;

use crate::error::CliError;

/// Resolution of the progress bar.
const PROGRESS_STEPS: u64 = 1000;

/// Arguments for the build command.
pub struct BuildArgs {
    pub lon: f64,
    pub lat: f64,
    pub radius: Option<f64>,
    pub quad_size: Option<f64>,
    pub blend_gauge: Option<f64>,
    pub landuse: Option<PathBuf>,
    pub output: PathBuf,
    pub no_cache: bool,
}

/// Run the build command.
pub fn run(args: BuildArgs, config: &ConfigFile) -> Result<(), CliError> {
    let origin = GeoOrigin::new(args.lon, args.lat)
        .map_err(|e| CliError::Config(format!("Invalid origin: {}", e)))?;
    let settings = resolve_settings(&args, config)?;
    let layout = settings
        .layout()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let ways = match &args.landuse {
        Some(path) => LandUseDocument::load(path)?.into_local(&origin),
        None => Vec::new(),
    };

    let source = config.source()?;
    let fetch_config = config.fetch_config();
    let client = AsyncReqwestClient::new()?;

    println!("TerraLayer Build v{}", terralayer::VERSION);
    println!("==================");
    println!();
    println!("Origin:     {:.6}, {:.6}", origin.longitude, origin.latitude);
    println!("Radius:     {} m", settings.radius);
    println!("Quad size:  {} m", settings.quad_size);
    println!("Grid:       {0} x {0} vertices", layout.size());
    println!("Land use:   {} ways", ways.len());
    if args.no_cache {
        println!("Cache:      disabled");
    } else {
        println!("Cache:      {}", config.cache.directory.display());
    }
    println!();

    let cancellation = CancellationToken::new();
    let ctrlc_token = cancellation.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nCancelling build...");
        ctrlc_token.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Config(format!("Failed to start runtime: {}", e)))?;

    let progress = PhaseProgress::new();
    let callback = progress.callback();

    let result = runtime.block_on(async move {
        if args.no_cache {
            let fetcher = TileFetcher::new(client, MemoryTileCache::new(), source, fetch_config);
            run_build(&settings, origin, &fetcher, ways, &cancellation, callback).await
        } else {
            let cache = DiskTileCache::new(&config.cache.directory);
            let fetcher = TileFetcher::new(client, cache, source, fetch_config);
            run_build(&settings, origin, &fetcher, ways, &cancellation, callback).await
        }
    });
    progress.finish();

    let build = result?;
    let written = write_outputs(&build, &args.output)?;

    info!(output = %args.output.display(), files = written.len(), "Build outputs written");

    println!("Elevation:  {:.1} m .. {:.1} m", build.elevation_range.min, build.elevation_range.max);
    println!(
        "Scale:      [{:.4}, {:.4}, {:.4}]",
        build.transform.scale[0], build.transform.scale[1], build.transform.scale[2]
    );
    println!("Lighting LOD: {}", build.lighting_lod);
    println!();
    for path in written {
        println!("Wrote {}", path.display());
    }

    Ok(())
}

async fn run_build<K: TileCache>(
    settings: &BuildSettings,
    origin: GeoOrigin,
    fetcher: &TileFetcher<AsyncReqwestClient, K>,
    ways: Vec<LandUseWay>,
    cancellation: &CancellationToken,
    callback: BuildProgressCallback,
) -> Result<LandscapeBuild, CliError> {
    Ok(build_landscape(settings, origin, fetcher, ways, cancellation, Some(callback)).await?)
}

/// Applies command-line overrides on top of the configured settings.
fn resolve_settings(args: &BuildArgs, config: &ConfigFile) -> Result<BuildSettings, CliError> {
    let mut settings = config.build_settings();
    if let Some(radius) = args.radius {
        settings.radius = radius;
    }
    if let Some(quad_size) = args.quad_size {
        settings.quad_size = quad_size;
    }
    if let Some(blend_gauge) = args.blend_gauge {
        settings.blend_gauge = blend_gauge;
    }
    settings
        .validate()
        .map_err(|e| CliError::Config(e.to_string()))?;
    Ok(settings)
}

/// One progress bar, restyled whenever the build enters a new phase.
struct PhaseProgress {
    bar: ProgressBar,
    phase: Arc<Mutex<Option<BuildPhase>>>,
}

impl PhaseProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(PROGRESS_STEPS).with_style(
            ProgressStyle::with_template("{msg:32} [{bar:40.cyan/blue}] {percent:>3}%")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self {
            bar,
            phase: Arc::new(Mutex::new(None)),
        }
    }

    fn callback(&self) -> BuildProgressCallback {
        let bar = self.bar.clone();
        let phase = Arc::clone(&self.phase);
        Arc::new(move |progress: BuildProgress| {
            let mut current = phase.lock();
            if *current != Some(progress.phase) {
                if let Some(done) = *current {
                    bar.println(format!("{} ... done", done));
                }
                *current = Some(progress.phase);
                bar.reset();
            }
            let message = match progress.items {
                Some((done, total)) => format!("{} ({}/{})", progress.phase, done, total),
                None => progress.phase.to_string(),
            };
            bar.set_message(message);
            bar.set_position((progress.fraction * PROGRESS_STEPS as f64).round() as u64);
        })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Writes the heightmap, transform and weight layers into `dir`.
fn write_outputs(build: &LandscapeBuild, dir: &Path) -> Result<Vec<PathBuf>, CliError> {
    fs::create_dir_all(dir)?;
    let size = build.heightmap.size();
    let mut written = Vec::new();

    let raw_path = dir.join("heightmap.r16");
    fs::write(&raw_path, build.heightmap.to_le_bytes())?;
    written.push(raw_path);

    written.push(write_heightmap_png(size, build.heightmap.data(), dir)?);

    let transform_path = dir.join("transform.json");
    fs::write(&transform_path, transform_json(build))?;
    written.push(transform_path);

    for layer in &build.weight_layers {
        written.push(write_weight_png(size, layer, dir)?);
    }

    Ok(written)
}

fn write_heightmap_png(size: u32, data: &[u16], dir: &Path) -> Result<PathBuf, CliError> {
    let image: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_raw(size, size, data.to_vec())
        .ok_or_else(|| CliError::Output("heightmap does not match grid size".to_string()))?;
    let path = dir.join("heightmap.png");
    image.save(&path)?;
    Ok(path)
}

fn write_weight_png(size: u32, layer: &WeightLayer, dir: &Path) -> Result<PathBuf, CliError> {
    let image = GrayImage::from_raw(size, size, layer.data.clone()).ok_or_else(|| {
        CliError::Output(format!("weight layer {} does not match grid size", layer.name))
    })?;
    let path = dir.join(format!("weight_{}.png", layer.name.to_lowercase()));
    image.save(&path)?;
    Ok(path)
}

fn transform_json(build: &LandscapeBuild) -> String {
    let value = serde_json::json!({
        "scale": build.transform.scale,
        "size": build.layout.size(),
        "half_size": build.layout.half_size,
        "subsection_size_quads": build.layout.subsection_size_quads,
        "elevation_min": build.elevation_range.min,
        "elevation_max": build.elevation_range.max,
        "lighting_lod": build.lighting_lod,
        "layers": build.weight_layers.iter().map(|l| l.name.as_str()).collect::<Vec<_>>(),
    });
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args() -> BuildArgs {
        BuildArgs {
            lon: 8.54,
            lat: 47.37,
            radius: None,
            quad_size: None,
            blend_gauge: None,
            landuse: None,
            output: PathBuf::from("out"),
            no_cache: true,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let config = ConfigFile::default();
        let args = BuildArgs {
            radius: Some(500.0),
            quad_size: Some(2.0),
            ..args()
        };

        let settings = resolve_settings(&args, &config).unwrap();
        assert_eq!(settings.radius, 500.0);
        assert_eq!(settings.quad_size, 2.0);
        assert_eq!(settings.blend_gauge, config.landscape.blend_gauge);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let args = BuildArgs {
            quad_size: Some(-1.0),
            ..args()
        };
        assert!(matches!(
            resolve_settings(&args, &ConfigFile::default()),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_heightmap_png_is_sixteen_bit() {
        let temp = TempDir::new().unwrap();
        let data: Vec<u16> = (0..16).map(|i| i * 4096).collect();

        let path = write_heightmap_png(4, &data, temp.path()).unwrap();

        let image = image::open(&path).unwrap().into_luma16();
        assert_eq!(image.dimensions(), (4, 4));
        assert_eq!(image.get_pixel(3, 3).0[0], 15 * 4096);
    }

    #[test]
    fn test_weight_png_size_mismatch() {
        let temp = TempDir::new().unwrap();
        let layer = WeightLayer {
            name: "Wood".to_string(),
            data: vec![255; 3],
        };
        assert!(matches!(
            write_weight_png(4, &layer, temp.path()),
            Err(CliError::Output(_))
        ));

        let layer = WeightLayer {
            name: "Wood".to_string(),
            data: vec![255; 16],
        };
        let path = write_weight_png(4, &layer, temp.path()).unwrap();
        assert!(path.ends_with("weight_wood.png"));
    }
}
