//! The INI configuration file and its translation into runtime settings.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use tracing::{debug, warn};

use super::ConfigError;
use crate::aggregate::DEFAULT_MAX_CONCURRENT_GEOMETRIES;
use crate::cache::{TileCacheConfig, DEFAULT_MAX_CONCURRENT_FETCHES};
use crate::provider::{AsyncReqwestClient, ProviderError};
use crate::source::DataSource;
use crate::store::{Identifier, PgStoreConfig, TableName};

/// User agent sent with tile requests unless configured otherwise.
pub const DEFAULT_USER_AGENT: &str = concat!("waymeta/", env!("CARGO_PKG_VERSION"));

/// Section whose entries are sent as request headers to sources that need
/// authentication.
pub const HEADERS_SECTION: &str = "strava_headers";

const DATABASE_SECTION: &str = "database";
const FETCH_SECTION: &str = "fetch";

/// Path of the configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("waymeta")
        .join("config.ini")
}

/// `[database]` settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseSettings {
    /// Connection URL. Usually given on the command line instead.
    pub url: Option<String>,
    pub ways_table: String,
    pub geometry_column: String,
    pub metadata_table: String,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        let store = PgStoreConfig::default();
        Self {
            url: None,
            ways_table: store.ways_table.to_string(),
            geometry_column: store.geometry_column.to_string(),
            metadata_table: store.metadata_table.to_string(),
            max_connections: store.max_connections,
        }
    }
}

/// `[fetch]` settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub max_concurrent_fetches: usize,
    pub max_concurrent_geometries: usize,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            max_concurrent_geometries: DEFAULT_MAX_CONCURRENT_GEOMETRIES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Per-source section (`[popularity]`, `[greenery]`, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceOverride {
    pub url_template: Option<String>,
    pub zoom: Option<u8>,
    pub tile_size: Option<u32>,
}

impl SourceOverride {
    fn is_empty(&self) -> bool {
        self.url_template.is_none() && self.zoom.is_none() && self.tile_size.is_none()
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub database: DatabaseSettings,
    pub fetch: FetchSettings,
    /// Overrides keyed by source name.
    pub sources: BTreeMap<String, SourceOverride>,
    /// Headers for sources that require authentication, in file order.
    pub headers: Vec<(String, String)>,
}

impl ConfigFile {
    /// Loads the file at [`config_file_path`], or defaults if it is missing.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Loads `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Self::from_ini(&ini)
    }

    /// Writes the configuration to [`config_file_path`].
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Writes the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        self.to_ini().write_to_file(path).map_err(write_error)
    }

    /// Defaults with every preset spelled out, as a starting point to edit.
    pub fn with_preset_sources() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for name in DataSource::names() {
            let source = DataSource::preset(name)?;
            config.sources.insert(
                name.to_string(),
                SourceOverride {
                    url_template: Some(source.template.to_string()),
                    zoom: Some(source.zoom),
                    tile_size: Some(source.tile_size),
                },
            );
        }
        Ok(config)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some(DATABASE_SECTION)) {
            let db = &mut config.database;
            if let Some(url) = section.get("url").filter(|v| !v.is_empty()) {
                db.url = Some(url.to_string());
            }
            read_string(section, "ways_table", &mut db.ways_table);
            read_string(section, "geometry_column", &mut db.geometry_column);
            read_string(section, "metadata_table", &mut db.metadata_table);
            read_parsed(section, DATABASE_SECTION, "max_connections", &mut db.max_connections)?;
        }

        if let Some(section) = ini.section(Some(FETCH_SECTION)) {
            let fetch = &mut config.fetch;
            read_parsed(section, FETCH_SECTION, "timeout_secs", &mut fetch.timeout_secs)?;
            if fetch.timeout_secs == 0 {
                return Err(ConfigError::InvalidValue {
                    section: FETCH_SECTION.to_string(),
                    key: "timeout_secs".to_string(),
                    value: "0".to_string(),
                    reason: "timeout must be at least 1 second".to_string(),
                });
            }
            read_parsed(
                section,
                FETCH_SECTION,
                "max_concurrent_fetches",
                &mut fetch.max_concurrent_fetches,
            )?;
            read_parsed(
                section,
                FETCH_SECTION,
                "max_concurrent_geometries",
                &mut fetch.max_concurrent_geometries,
            )?;
            read_string(section, "user_agent", &mut fetch.user_agent);
        }

        for name in DataSource::names() {
            let Some(section) = ini.section(Some(name)) else {
                continue;
            };
            let source = SourceOverride {
                url_template: section.get("url_template").map(str::to_string),
                zoom: optional_parsed(section, name, "zoom")?,
                tile_size: optional_parsed(section, name, "tile_size")?,
            };
            if !source.is_empty() {
                config.sources.insert(name.to_string(), source);
            }
        }

        if let Some(section) = ini.section(Some(HEADERS_SECTION)) {
            config.headers = section
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect();
        }

        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();

        let db = &self.database;
        ini.with_section(Some(DATABASE_SECTION))
            .set("url", db.url.clone().unwrap_or_default())
            .set("ways_table", db.ways_table.as_str())
            .set("geometry_column", db.geometry_column.as_str())
            .set("metadata_table", db.metadata_table.as_str())
            .set("max_connections", db.max_connections.to_string());

        let fetch = &self.fetch;
        ini.with_section(Some(FETCH_SECTION))
            .set("timeout_secs", fetch.timeout_secs.to_string())
            .set("max_concurrent_fetches", fetch.max_concurrent_fetches.to_string())
            .set(
                "max_concurrent_geometries",
                fetch.max_concurrent_geometries.to_string(),
            )
            .set("user_agent", fetch.user_agent.as_str());

        for (name, source) in &self.sources {
            let mut section = ini.with_section(Some(name.as_str()));
            if let Some(template) = &source.url_template {
                section.set("url_template", template.as_str());
            }
            if let Some(zoom) = source.zoom {
                section.set("zoom", zoom.to_string());
            }
            if let Some(tile_size) = source.tile_size {
                section.set("tile_size", tile_size.to_string());
            }
        }

        for (name, value) in &self.headers {
            ini.with_section(Some(HEADERS_SECTION))
                .set(name.as_str(), value.as_str());
        }

        ini
    }

    /// Store settings with table and column names validated.
    pub fn store_config(&self) -> Result<PgStoreConfig, ConfigError> {
        Ok(PgStoreConfig {
            ways_table: TableName::parse(&self.database.ways_table)?,
            geometry_column: Identifier::new(&self.database.geometry_column)?,
            metadata_table: TableName::parse(&self.database.metadata_table)?,
            max_connections: self.database.max_connections.max(1),
        })
    }

    /// Tile cache tuning from `[fetch]`.
    pub fn cache_config(&self) -> TileCacheConfig {
        TileCacheConfig {
            fetch_timeout: self.fetch.timeout(),
            max_concurrent_fetches: self.fetch.max_concurrent_fetches,
        }
    }

    /// Resolves a data source preset with this file's overrides applied.
    pub fn source(&self, name: &str) -> Result<DataSource, ConfigError> {
        let preset = DataSource::preset(name)?;
        let source = match self.sources.get(name) {
            Some(o) => preset.with_overrides(o.url_template.as_deref(), o.zoom, o.tile_size)?,
            None => preset,
        };
        Ok(source)
    }

    /// Builds the HTTP client for `source`, attaching the configured
    /// headers when the source requires them.
    pub fn http_client(&self, source: &DataSource) -> Result<AsyncReqwestClient, ProviderError> {
        let headers: &[(String, String)] = if source.needs_headers {
            if self.headers.is_empty() {
                warn!(
                    source = %source.name,
                    section = HEADERS_SECTION,
                    "Source requires authentication headers but none are configured"
                );
            }
            &self.headers
        } else {
            &[]
        };
        AsyncReqwestClient::with_headers(
            self.fetch.timeout(),
            headers,
            Some(self.fetch.user_agent.as_str()),
        )
    }
}

fn read_string(section: &Properties, key: &str, target: &mut String) {
    if let Some(value) = section.get(key).filter(|v| !v.is_empty()) {
        *target = value.to_string();
    }
}

fn read_parsed<T>(
    section: &Properties,
    section_name: &str,
    key: &str,
    target: &mut T,
) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    if let Some(value) = optional_parsed(section, section_name, key)? {
        *target = value;
    }
    Ok(())
}

fn optional_parsed<T>(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = section.get(key).map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    raw.parse()
        .map(Some)
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            section: section_name.to_string(),
            key: key.to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        })
}
