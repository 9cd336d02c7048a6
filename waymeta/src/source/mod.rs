//! Named data sources.
//!
//! A data source bundles everything needed to score geometries against one
//! tile service: the URL template, the tile size the service renders, the
//! zoom level to sample at, the sampler that turns pixels into values and the
//! metric column the results are written to.
//!
//! Three presets are built in. Their template, zoom and tile size can be
//! overridden at runtime (see [`DataSource::with_overrides`]).

use std::fmt;

use thiserror::Error;

use crate::coord::{CoordError, Projector, MAX_ZOOM};
use crate::provider::{TemplateError, UrlTemplate};
use crate::sampler::ValueSampler;
use crate::store::Identifier;

/// Errors from resolving a data source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    #[error("unknown data source {0:?} (expected one of: {})", DataSource::names().join(", "))]
    Unknown(String),

    #[error("invalid URL template for {source_name}: {error}")]
    Template {
        source_name: String,
        #[source]
        error: TemplateError,
    },

    #[error("invalid settings for {source_name}: {error}")]
    Coord {
        source_name: String,
        #[source]
        error: CoordError,
    },
}

struct Preset {
    name: &'static str,
    metric: &'static str,
    template: &'static str,
    tile_size: u32,
    zoom: u8,
    sampler: ValueSampler,
    needs_headers: bool,
}

static PRESETS: [Preset; 3] = [
    Preset {
        name: "popularity",
        metric: "popularity",
        template: "https://heatmap-external-b.strava.com/tiles/all/hot/${z}/${x}/${y}.png?px=256",
        tile_size: 256,
        zoom: 12,
        sampler: ValueSampler::Grayscale,
        needs_headers: false,
    },
    Preset {
        name: "popularity-highres",
        metric: "popularity_highres",
        template: "https://heatmap-external-b.strava.com/tiles-auth/all/hot/${z}/${x}/${y}.png",
        tile_size: 512,
        zoom: 15,
        sampler: ValueSampler::Grayscale,
        needs_headers: true,
    },
    Preset {
        name: "greenery",
        metric: "greenery",
        template: "http://mt1.google.com/vt/lyrs=s&x=${x}&y=${y}&z=${z}",
        tile_size: 256,
        zoom: 15,
        sampler: ValueSampler::Greenery,
        needs_headers: false,
    },
];

/// Sources processed when none are named explicitly.
///
/// The high-resolution heatmap needs session headers, so it is opt-in.
pub const DEFAULT_SOURCES: [&str; 2] = ["popularity", "greenery"];

/// One tile service and how to sample it.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSource {
    pub name: String,
    /// Column the normalized scores are written to.
    pub metric: Identifier,
    pub template: UrlTemplate,
    pub tile_size: u32,
    pub zoom: u8,
    pub sampler: ValueSampler,
    /// Whether requests must carry the configured authentication headers.
    pub needs_headers: bool,
}

impl DataSource {
    /// Looks up a built-in preset by name.
    pub fn preset(name: &str) -> Result<Self, SourceError> {
        let preset = PRESETS
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| SourceError::Unknown(name.to_string()))?;

        let template = UrlTemplate::parse(preset.template).map_err(|error| {
            SourceError::Template {
                source_name: preset.name.to_string(),
                error,
            }
        })?;

        Ok(Self {
            name: preset.name.to_string(),
            metric: Identifier::from_static(preset.metric),
            template,
            tile_size: preset.tile_size,
            zoom: preset.zoom,
            sampler: preset.sampler,
            needs_headers: preset.needs_headers,
        })
    }

    /// Names of all built-in presets.
    pub fn names() -> Vec<&'static str> {
        PRESETS.iter().map(|p| p.name).collect()
    }

    /// Replaces the template, zoom or tile size where an override is given.
    pub fn with_overrides(
        mut self,
        template: Option<&str>,
        zoom: Option<u8>,
        tile_size: Option<u32>,
    ) -> Result<Self, SourceError> {
        if let Some(raw) = template {
            self.template = UrlTemplate::parse(raw).map_err(|error| SourceError::Template {
                source_name: self.name.clone(),
                error,
            })?;
        }
        if let Some(zoom) = zoom {
            if zoom > MAX_ZOOM {
                return Err(self.coord_error(CoordError::InvalidZoom(zoom)));
            }
            self.zoom = zoom;
        }
        if let Some(tile_size) = tile_size {
            if tile_size == 0 {
                return Err(self.coord_error(CoordError::InvalidTileSize(tile_size)));
            }
            self.tile_size = tile_size;
        }
        Ok(self)
    }

    /// Projector matching this source's tile size.
    pub fn projector(&self) -> Result<Projector, SourceError> {
        Projector::new(self.tile_size).map_err(|error| self.coord_error(error))
    }

    fn coord_error(&self, error: CoordError) -> SourceError {
        SourceError::Coord {
            source_name: self.name.clone(),
            error,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (zoom {}, {}px tiles, {} sampler -> {})",
            self.name,
            self.zoom,
            self.tile_size,
            self.sampler.name(),
            self.metric
        )
    }
}
