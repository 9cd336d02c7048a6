//! Locate command - show where a coordinate lands in a source's tile grid.

use std::path::Path;

use clap::Args;
use waymeta::coord::GeoPoint;

use super::common::{load_config, source_parser};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct LocateArgs {
    /// Latitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    /// Data source whose zoom, tile size and URL template to use
    #[arg(long, default_value = "popularity", value_parser = source_parser())]
    pub source: String,
}

/// Run the locate command.
pub fn run(args: LocateArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    validate_coordinates(args.lat, args.lon)?;

    let config = load_config(config_path)?;
    let source = config.source(&args.source)?;
    let projector = source
        .projector()
        .map_err(|e| CliError::Config(e.to_string()))?;
    let (tile, pixel) = projector
        .locate(GeoPoint::new(args.lon, args.lat), source.zoom)
        .map_err(|e| CliError::Config(e.to_string()))?;

    println!("Source: {}", source);
    println!("Tile:   {}", tile);
    println!("Pixel:  {}, {}", pixel.x, pixel.y);
    println!("URL:    {}", source.template.render(tile));
    Ok(())
}

fn validate_coordinates(lat: f64, lon: f64) -> Result<(), CliError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(CliError::InvalidArgument(format!(
            "latitude {} outside [-90, 90]",
            lat
        )));
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(CliError::InvalidArgument(format!(
            "longitude {} outside [-180, 180]",
            lon
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(40.7128, -74.0060).is_ok());
        assert!(validate_coordinates(90.0, 180.0).is_ok());
        assert!(matches!(
            validate_coordinates(91.0, 0.0),
            Err(CliError::InvalidArgument(_))
        ));
        assert!(matches!(
            validate_coordinates(0.0, -180.5),
            Err(CliError::InvalidArgument(_))
        ));
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
    }
}
