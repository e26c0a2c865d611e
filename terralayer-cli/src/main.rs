//! TerraLayer CLI - Command-line interface
//!
//! Builds landscape heightmaps from real-world elevation tiles and manages
//! the tile cache and configuration file.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use terralayer::config::ConfigFile;
use terralayer::logging::{init_logging, DEFAULT_LOG_FILE};

use commands::build::BuildArgs;
use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use error::CliError;

#[derive(Parser)]
#[command(name = "terralayer")]
#[command(version = terralayer::VERSION)]
#[command(about = "Real-world elevation import for terrain heightmaps", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a heightmap and blend weights around a geographic origin
    Build {
        /// Longitude of the landscape center in degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Latitude of the landscape center in degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Landscape radius in meters (default from config)
        #[arg(long)]
        radius: Option<f64>,

        /// Vertex spacing in meters (default from config)
        #[arg(long)]
        quad_size: Option<f64>,

        /// Width of land-use blend borders in meters (default from config)
        #[arg(long)]
        blend_gauge: Option<f64>,

        /// Land-use ways as JSON
        #[arg(long)]
        landuse: Option<PathBuf>,

        /// Output directory
        #[arg(long, short)]
        output: PathBuf,

        /// Keep downloaded tiles in memory only
        #[arg(long)]
        no_cache: bool,
    },

    /// Manage the elevation tile cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// View and modify configuration settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Build {
            lon,
            lat,
            radius,
            quad_size,
            blend_gauge,
            landuse,
            output,
            no_cache,
        } => {
            let config = ConfigFile::load().unwrap_or_default();
            let _logging = init_logging(&config.logging.directory, DEFAULT_LOG_FILE)
                .map_err(|e| CliError::Logging(e.to_string()))?;

            commands::build::run(
                BuildArgs {
                    lon,
                    lat,
                    radius,
                    quad_size,
                    blend_gauge,
                    landuse,
                    output,
                    no_cache,
                },
                &config,
            )
        }
        Commands::Cache { action } => commands::cache::run(action),
        Commands::Config { command } => commands::config::run(command),
    }
}
