//! Configuration inspection commands.
//!
//! Provides `config path` and `config show`.

use std::path::Path;

use clap::Subcommand;
use waymeta::config::ConfigFile;
use waymeta::source::DataSource;

use super::common::{load_config, resolve_config_path};
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective settings and data sources
    Show,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => {
            println!("{}", resolve_config_path(config_path).display());
            Ok(())
        }
        ConfigCommands::Show => run_show(&load_config(config_path)?),
    }
}

fn run_show(config: &ConfigFile) -> Result<(), CliError> {
    let db = &config.database;
    println!("[database]");
    println!(
        "  url = {}",
        db.url.as_deref().map(redact_url).unwrap_or_else(|| "(not set)".to_string())
    );
    println!("  ways_table = {}", db.ways_table);
    println!("  geometry_column = {}", db.geometry_column);
    println!("  metadata_table = {}", db.metadata_table);
    println!();

    let fetch = &config.fetch;
    println!("[fetch]");
    println!("  timeout_secs = {}", fetch.timeout_secs);
    println!("  max_concurrent_fetches = {}", fetch.max_concurrent_fetches);
    println!("  max_concurrent_geometries = {}", fetch.max_concurrent_geometries);
    println!("  user_agent = {}", fetch.user_agent);
    println!();

    println!("Data sources");
    for name in DataSource::names() {
        let source = config.source(name)?;
        println!("  {}", source);
        println!("    {}", source.template);
    }
    if !config.headers.is_empty() {
        println!();
        println!("{} authentication header(s) configured", config.headers.len());
    }
    Ok(())
}

/// Hides the password in a connection URL.
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.split_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_url() {
        assert_eq!(
            redact_url("postgres://osm:secret@db:5432/routing"),
            "postgres://osm:***@db:5432/routing"
        );
        assert_eq!(redact_url("postgres://osm@db/routing"), "postgres://osm@db/routing");
        assert_eq!(redact_url("not a url"), "not a url");
    }
}
