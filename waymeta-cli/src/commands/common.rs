//! Common types and utilities shared across CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::builder::PossibleValuesParser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;
use waymeta::config::{config_file_path, ConfigFile};
use waymeta::source::{DataSource, DEFAULT_SOURCES};
use waymeta::telemetry::RunMetrics;

use crate::error::CliError;

/// How often the progress bar re-reads the run counters.
const PROGRESS_REFRESH: Duration = Duration::from_millis(200);

/// Parser restricting `--source` to the built-in data sources.
pub fn source_parser() -> PossibleValuesParser {
    PossibleValuesParser::new(DataSource::names())
}

/// The configuration file in effect: `--config` if given, else the default.
pub fn resolve_config_path(cli_path: Option<&Path>) -> PathBuf {
    cli_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path)
}

/// Loads the configuration, falling back to defaults when the file is missing.
pub fn load_config(cli_path: Option<&Path>) -> Result<ConfigFile, CliError> {
    Ok(ConfigFile::load_from(&resolve_config_path(cli_path))?)
}

/// Resolves source names (or the default set) with config overrides applied.
pub fn resolve_sources(
    names: &[String],
    config: &ConfigFile,
) -> Result<Vec<DataSource>, CliError> {
    let names: Vec<&str> = if names.is_empty() {
        DEFAULT_SOURCES.to_vec()
    } else {
        names.iter().map(String::as_str).collect()
    };

    let mut sources: Vec<DataSource> = Vec::with_capacity(names.len());
    for name in names {
        if sources.iter().any(|s| s.name == name) {
            continue;
        }
        sources.push(config.source(name)?);
    }
    Ok(sources)
}

/// Progress bar fed from a run's shared counters.
pub struct RunProgress {
    bar: ProgressBar,
    ticker: JoinHandle<()>,
}

impl RunProgress {
    /// Starts refreshing a bar for `source`. Must be called inside a tokio
    /// runtime.
    pub fn start(source: &str, metrics: Arc<RunMetrics>, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        let style = ProgressStyle::default_bar()
            .template("{prefix:>20.cyan.bold} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.set_prefix(source.to_string());

        let handle = bar.clone();
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(PROGRESS_REFRESH);
            loop {
                interval.tick().await;
                let snapshot = metrics.snapshot();
                handle.set_length(snapshot.geometries_total);
                handle.set_position(snapshot.geometries_processed());
                handle.set_message(format!(
                    "{} tiles, {} without data",
                    snapshot.tiles_fetched,
                    snapshot.tile_failures()
                ));
            }
        });

        Self { bar, ticker }
    }

    /// Stops refreshing and removes the bar.
    pub fn finish(self) {
        self.ticker.abort();
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_sources() {
        let sources = resolve_sources(&[], &ConfigFile::default()).unwrap();
        let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["popularity", "greenery"]);
    }

    #[test]
    fn test_duplicate_sources_collapsed() {
        let requested = vec!["greenery".to_string(), "greenery".to_string()];
        let sources = resolve_sources(&requested, &ConfigFile::default()).unwrap();
        assert_eq!(sources.len(), 1);
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let path = PathBuf::from("/tmp/custom.ini");
        assert_eq!(resolve_config_path(Some(&path)), path);
        assert_eq!(resolve_config_path(None), config_file_path());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        fs::write(&path, "[database]\nurl = postgres://localhost/osm\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.database.url.as_deref(), Some("postgres://localhost/osm"));
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        fs::write(&path, "[greenery]\nzoom = deep\n").unwrap();

        assert!(matches!(load_config(Some(&path)), Err(CliError::Config(_))));
    }
}
