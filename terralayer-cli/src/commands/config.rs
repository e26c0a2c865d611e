//! `config` subcommands for `~/.terralayer/config.ini`.
//!
//! Values written with `set` are checked against the whole configuration so a
//! saved file always yields a usable elevation source and build settings.

use clap::Subcommand;
use terralayer::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one configuration value
    Get {
        /// Key in the form section.key, e.g. landscape.radius
        key: String,
    },

    /// Change one configuration value
    Set {
        /// Key in the form section.key, e.g. landscape.radius
        key: String,

        /// New value
        value: String,
    },

    /// Restore one configuration value to its default
    Unset {
        /// Key in the form section.key, e.g. landscape.radius
        key: String,
    },

    /// List every setting next to its default
    List {
        /// Only show settings that differ from the default
        #[arg(long)]
        changed: bool,
    },

    /// Print the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => run_get(&key),
        ConfigCommands::Set { key, value } => run_set(&key, &value),
        ConfigCommands::Unset { key } => run_unset(&key),
        ConfigCommands::List { changed } => run_list(changed),
        ConfigCommands::Path => run_path(),
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'terralayer config list' to see available keys.",
            key
        ))
    })
}

fn run_get(key: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let config = ConfigFile::load()?;
    let value = config_key.get(&config);

    if value.is_empty() {
        println!("(not set)");
    } else {
        println!("{}", value);
    }
    Ok(())
}

fn run_set(key: &str, value: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let mut config = ConfigFile::load()?;
    apply(&mut config, config_key, value)?;
    config.save()?;

    println!("Set {} = {}", config_key.name(), config_key.get(&config));
    Ok(())
}

fn run_unset(key: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let mut config = ConfigFile::load()?;
    let default = config_key.get(&ConfigFile::default());
    apply(&mut config, config_key, &default)?;
    config.save()?;

    println!("Reset {} to {}", config_key.name(), display_value(&default));
    Ok(())
}

fn run_list(changed_only: bool) -> Result<(), CliError> {
    let path = config_file_path();
    let config = ConfigFile::load()?;

    if path.exists() {
        println!("Configuration: {}", path.display());
    } else {
        println!("Configuration: {} (not created, using defaults)", path.display());
    }
    println!();

    let lines = list_lines(&config, &ConfigFile::default(), changed_only);
    if lines.is_empty() {
        println!("All settings are at their defaults.");
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path().display());
    Ok(())
}

/// Stores `value` under `key` and rejects a configuration that could not build.
fn apply(config: &mut ConfigFile, key: ConfigKey, value: &str) -> Result<(), CliError> {
    key.set(config, value)?;
    check_config(config)
}

fn check_config(config: &ConfigFile) -> Result<(), CliError> {
    config.source()?;
    config
        .build_settings()
        .validate()
        .map_err(|e| CliError::Config(e.to_string()))
}

fn display_value(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}

/// Renders settings grouped by section.
///
/// Overridden values are marked with `*` and followed by their default.
fn list_lines(config: &ConfigFile, defaults: &ConfigFile, changed_only: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_section = "";

    for key in ConfigKey::all() {
        let value = key.get(config);
        let default = key.get(defaults);
        let changed = value != default;
        if changed_only && !changed {
            continue;
        }

        let section = key.section();
        if section != current_section {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.push(format!("[{}]", section));
            current_section = section;
        }

        if changed {
            lines.push(format!(
                "* {} = {}  (default: {})",
                key.key_name(),
                display_value(&value),
                display_value(&default)
            ));
        } else {
            lines.push(format!("  {} = {}", key.key_name(), display_value(&value)));
        }
    }
    lines
}
