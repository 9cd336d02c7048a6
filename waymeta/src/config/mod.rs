//! Configuration file support.
//!
//! Settings live in an INI file at `~/.config/waymeta/config.ini` (the
//! platform config directory on other systems). A missing file is not an
//! error: every setting has a default and command-line flags override the
//! file.
//!
//! ```ini
//! [database]
//! url = postgres://osm@localhost/routing
//! ways_table = ways
//! metadata_table = ways_metadata
//!
//! [fetch]
//! timeout_secs = 30
//! max_concurrent_fetches = 16
//!
//! [greenery]
//! zoom = 16
//!
//! [strava_headers]
//! Cookie = CloudFront-Key-Pair-Id=...; CloudFront-Signature=...
//! ```

mod file;

pub use file::{
    config_file_path, ConfigFile, DatabaseSettings, FetchSettings, SourceOverride,
    DEFAULT_USER_AGENT, HEADERS_SECTION,
};

use std::path::PathBuf;

use thiserror::Error;

use crate::source::SourceError;
use crate::store::StoreError;

/// Errors from reading, writing or interpreting the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value {value:?} for {section}.{key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
