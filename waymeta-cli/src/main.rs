//! waymeta CLI - Command-line interface
//!
//! Scores road geometries in a PostGIS database against raster tile
//! services and writes the results back as metadata columns.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use waymeta::logging::init_logging;

use commands::config::ConfigCommands;
use commands::locate::LocateArgs;
use commands::run::RunArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "waymeta")]
#[command(version, about = "Enrich road geometries with metadata sampled from raster tiles")]
struct Cli {
    /// Path to the configuration file (default: ~/.config/waymeta/config.ini)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Score geometries and write metadata for one or more data sources
    Run(RunArgs),

    /// Show the tile, pixel and URL a coordinate resolves to
    Locate(LocateArgs),

    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Inspect configuration
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
    // Guard flushes the log file on drop
    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run(args) => commands::run::run(args, config_path),
        Commands::Locate(args) => commands::locate::run(args, config_path),
        Commands::Init { force } => commands::init::run(config_path, force),
        Commands::Config { command } => commands::config::run(command, config_path),
    }
}
