//! Run orchestration for one data source.
//!
//! A [`MetadataPipeline`] wires the pieces together for a single source:
//!
//! ```text
//! GeometrySource ──► GeometryAggregator ──► MetadataSink
//!                       │
//!                       ├─ Projector      (vertex → tile + pixel)
//!                       ├─ TileCache      (tile → raster, fetched once)
//!                       └─ ValueSampler   (raster + pixel → value)
//! ```
//!
//! Progress is published through a shared [`RunMetrics`] so a caller can
//! render it while the run is in flight.
//!
//! # Example
//!
//! ```ignore
//! let config = ConfigFile::load()?;
//! let source = config.source("greenery")?;
//! let client = config.http_client(&source)?;
//! let pipeline = MetadataPipeline::new(source, client, PipelineOptions::from_config(&config));
//! let summary = pipeline.run(&store).await?;
//! println!("{}", summary);
//! ```

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::aggregate::{GeometryAggregator, DEFAULT_MAX_CONCURRENT_GEOMETRIES};
use crate::cache::{TileCache, TileCacheConfig};
use crate::config::ConfigFile;
use crate::coord::CoordError;
use crate::provider::{AsyncHttpClient, TemplateProvider};
use crate::source::{DataSource, SourceError};
use crate::store::{GeometrySource, Identifier, MetadataSink, StoreError};
use crate::telemetry::{RunMetrics, TelemetrySnapshot};

/// Errors that abort a run.
///
/// Tile failures are not among them: they turn into missing samples.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Coord(#[from] CoordError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Tuning for a run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub cache: TileCacheConfig,
    pub max_concurrent_geometries: usize,
    /// Score everything but skip the write.
    pub dry_run: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            cache: TileCacheConfig::default(),
            max_concurrent_geometries: DEFAULT_MAX_CONCURRENT_GEOMETRIES,
            dry_run: false,
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &ConfigFile) -> Self {
        Self {
            cache: config.cache_config(),
            max_concurrent_geometries: config.fetch.max_concurrent_geometries,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub source: String,
    pub metric: Identifier,
    pub geometries_read: usize,
    pub geometries_scored: usize,
    pub geometries_skipped: usize,
    pub records_written: u64,
    pub dry_run: bool,
    pub telemetry: TelemetrySnapshot,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}/{} geometries scored ({} without data), ",
            self.source, self.geometries_scored, self.geometries_read, self.geometries_skipped
        )?;
        if self.dry_run {
            write!(f, "dry run, nothing written to {}", self.metric)
        } else {
            write!(f, "{} records written to {}", self.records_written, self.metric)
        }
    }
}

/// Scores every geometry against one data source and stores the result.
pub struct MetadataPipeline<C: AsyncHttpClient> {
    source: DataSource,
    http_client: C,
    options: PipelineOptions,
    metrics: Arc<RunMetrics>,
}

impl<C: AsyncHttpClient> MetadataPipeline<C> {
    pub fn new(source: DataSource, http_client: C, options: PipelineOptions) -> Self {
        Self {
            source,
            http_client,
            options,
            metrics: Arc::new(RunMetrics::new()),
        }
    }

    /// Counters for this run, live while [`run`](Self::run) is in flight.
    pub fn metrics(&self) -> Arc<RunMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// Loads, scores and (unless dry-running) upserts.
    ///
    /// A failed upsert aborts the run for this source; nothing is written.
    pub async fn run<S>(self, store: &S) -> Result<RunSummary, PipelineError>
    where
        S: GeometrySource + MetadataSink,
    {
        let Self {
            source,
            http_client,
            options,
            metrics,
        } = self;

        info!(source = %source, dry_run = options.dry_run, "Starting run");

        let projector = source.projector()?;
        let provider = TemplateProvider::new(source.name.clone(), source.template.clone(), http_client);
        let cache = TileCache::new(
            provider,
            source.sampler.color_mode(),
            options.cache.clone(),
            Arc::clone(&metrics),
        );
        let aggregator =
            GeometryAggregator::new(projector, source.zoom, source.sampler, cache, Arc::clone(&metrics))?
                .with_max_concurrent(options.max_concurrent_geometries);

        let geometries = store.load_geometries().await?;
        metrics.geometries_loaded(geometries.len() as u64);

        let scores = aggregator.aggregate(&geometries).await;

        let records_written = if options.dry_run {
            info!(metric = %source.metric, rows = scores.len(), "Dry run, skipping upsert");
            0
        } else {
            let written = store.upsert(&source.metric, &scores).await?;
            metrics.records_written(written);
            written
        };

        let summary = RunSummary {
            geometries_read: geometries.len(),
            geometries_scored: scores.len(),
            geometries_skipped: geometries.len() - scores.len(),
            records_written,
            dry_run: options.dry_run,
            telemetry: metrics.snapshot(),
            source: source.name,
            metric: source.metric,
        };
        info!(telemetry = %summary.telemetry, "{}", summary);
        Ok(summary)
    }
}
