//! Init command - write a default configuration file.

use std::path::Path;

use waymeta::config::ConfigFile;

use super::common::resolve_config_path;
use crate::error::CliError;

/// Run the init command.
pub fn run(config_path: Option<&Path>, force: bool) -> Result<(), CliError> {
    let path = resolve_config_path(config_path);

    if path.exists() && !force {
        println!("Configuration file already exists: {}", path.display());
        println!("Use --force to overwrite it with defaults.");
        return Ok(());
    }

    ConfigFile::with_preset_sources()?.save_to(&path)?;

    println!("Configuration file: {}", path.display());
    println!();
    println!("Set url in the [database] section, or pass --database-url to 'waymeta run'.");
    println!("Authentication headers for popularity-highres go in [strava_headers].");
    Ok(())
}
