//! Per-geometry aggregation.
//!
//! Resolves every vertex of every geometry to a scalar
//! (projector → tile cache → sampler), reduces each geometry's samples to their
//! median, then rescales all geometry scores by the largest one observed.
//!
//! # Normalization
//!
//! Scores are relative to the maximum of the current run, not to an absolute
//! scale. Adding one very popular way to the network rescales every other way
//! on the next run.

mod reduce;

pub use reduce::{median, normalize_by_max};

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::cache::TileCache;
use crate::coord::{CoordError, GeoPoint, Projector, MAX_ZOOM};
use crate::geom::{Geometry, GeometryId};
use crate::provider::AsyncProvider;
use crate::sampler::ValueSampler;
use crate::telemetry::RunMetrics;

/// Default number of geometries scored concurrently.
pub const DEFAULT_MAX_CONCURRENT_GEOMETRIES: usize = 64;

/// Scores geometries against one tiled data source.
pub struct GeometryAggregator<P: AsyncProvider> {
    projector: Projector,
    zoom: u8,
    sampler: ValueSampler,
    cache: TileCache<P>,
    metrics: Arc<RunMetrics>,
    max_concurrent: usize,
}

impl<P: AsyncProvider> GeometryAggregator<P> {
    pub fn new(
        projector: Projector,
        zoom: u8,
        sampler: ValueSampler,
        cache: TileCache<P>,
        metrics: Arc<RunMetrics>,
    ) -> Result<Self, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }
        Ok(Self {
            projector,
            zoom,
            sampler,
            cache,
            metrics,
            max_concurrent: DEFAULT_MAX_CONCURRENT_GEOMETRIES,
        })
    }

    /// Sets how many geometries are scored at once.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn cache(&self) -> &TileCache<P> {
        &self.cache
    }

    /// Samples the data source under one vertex.
    ///
    /// Returns `None` when the vertex's tile has no data or the vertex
    /// coordinates are not finite.
    pub async fn sample_vertex(&self, point: GeoPoint) -> Option<f64> {
        if !point.lng.is_finite() || !point.lat.is_finite() {
            return None;
        }
        let (tile, pixel) = self.projector.locate(point, self.zoom).ok()?;
        let raster = self.cache.get(tile).await.ok()?;
        Some(self.sampler.sample(&raster, pixel))
    }

    /// Median of the vertex samples of one geometry.
    ///
    /// Vertices without data are left out; a geometry with no usable vertex
    /// has no score.
    pub async fn score(&self, geometry: &Geometry) -> Option<f64> {
        let samples = futures::future::join_all(
            geometry
                .vertices
                .iter()
                .map(|vertex| self.sample_vertex(*vertex)),
        )
        .await;

        let mut values: Vec<f64> = Vec::with_capacity(samples.len());
        for sample in samples {
            match sample {
                Some(value) => {
                    self.metrics.vertex_sampled();
                    values.push(value);
                }
                None => self.metrics.vertex_no_data(),
            }
        }

        let score = median(&mut values);
        match score {
            Some(_) => self.metrics.geometry_scored(),
            None => {
                debug!(geometry = %geometry.id, vertices = geometry.vertices.len(), "No data for any vertex, skipping");
                self.metrics.geometry_skipped();
            }
        }
        score
    }

    /// Scores every geometry and normalizes by the largest score.
    ///
    /// Geometries without any data are absent from the result.
    pub async fn aggregate(&self, geometries: &[Geometry]) -> HashMap<GeometryId, f64> {
        let scored: Vec<(GeometryId, Option<f64>)> = stream::iter(geometries)
            .map(|geometry| async move { (geometry.id, self.score(geometry).await) })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut scores: HashMap<GeometryId, f64> = scored
            .into_iter()
            .filter_map(|(id, score)| score.map(|s| (id, s)))
            .collect();

        let max = normalize_by_max(&mut scores);
        info!(
            scored = scores.len(),
            skipped = geometries.len() - scores.len(),
            distinct_tiles = self.cache.len(),
            max_score = max,
            "Aggregation complete"
        );
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TileCacheConfig;
    use crate::coord::TileIndex;
    use crate::provider::ProviderError;
    use crate::raster::ColorMode;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    /// Serves a uniform gray tile per column; columns not listed fail.
    struct ColumnProvider {
        values: HashMap<u32, u8>,
    }

    impl AsyncProvider for ColumnProvider {
        async fn download_tile(&self, tile: TileIndex) -> Result<Vec<u8>, ProviderError> {
            let value = self
                .values
                .get(&tile.x)
                .ok_or_else(|| ProviderError::HttpError("no tile".to_string()))?;
            let mut bytes = Vec::new();
            DynamicImage::ImageLuma8(GrayImage::from_pixel(256, 256, Luma([*value])))
                .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
                .map_err(|e| ProviderError::HttpError(e.to_string()))?;
            Ok(bytes)
        }

        fn name(&self) -> &str {
            "columns"
        }
    }

    /// Zoom-0 style grid at zoom 2: four columns 90° of longitude wide.
    fn lng_in_column(col: u32) -> f64 {
        -180.0 + 90.0 * f64::from(col) + 45.0
    }

    fn aggregator(values: &[(u32, u8)]) -> GeometryAggregator<ColumnProvider> {
        let metrics = Arc::new(RunMetrics::new());
        let cache = TileCache::new(
            ColumnProvider {
                values: values.iter().copied().collect(),
            },
            ColorMode::Luma,
            TileCacheConfig::default(),
            Arc::clone(&metrics),
        );
        GeometryAggregator::new(
            Projector::default(),
            2,
            ValueSampler::Grayscale,
            cache,
            metrics,
        )
        .unwrap()
    }

    fn way(id: i64, cols: &[u32]) -> Geometry {
        Geometry::new(
            id,
            cols.iter()
                .map(|&c| GeoPoint::new(lng_in_column(c), 10.0))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_score_excludes_missing_vertices() {
        // samples [0.2, 0.4, 0.2, no data] -> median of [0.2, 0.2, 0.4]
        let agg = aggregator(&[(0, 51), (1, 102)]);
        let score = agg.score(&way(1, &[0, 1, 0, 3])).await.unwrap();
        assert!((score - 0.2).abs() < 1e-12, "got {}", score);

        let snapshot = agg.metrics.snapshot();
        assert_eq!(snapshot.vertices_sampled, 3);
        assert_eq!(snapshot.vertices_no_data, 1);
    }

    #[tokio::test]
    async fn test_all_missing_geometry_is_skipped() {
        let agg = aggregator(&[(0, 255)]);
        let scores = agg.aggregate(&[way(1, &[0]), way(2, &[2, 3])]).await;

        assert_eq!(scores.len(), 1);
        assert!(!scores.contains_key(&GeometryId(2)));
        assert_eq!(agg.metrics.snapshot().geometries_skipped, 1);
    }

    #[tokio::test]
    async fn test_aggregate_normalizes_by_max() {
        // column values 51, 102, 204 -> 0.2, 0.4, 0.8
        let agg = aggregator(&[(0, 51), (1, 102), (2, 204)]);
        let scores = agg
            .aggregate(&[way(1, &[0, 0]), way(2, &[1]), way(3, &[2, 2, 2])])
            .await;

        assert!((scores[&GeometryId(1)] - 0.25).abs() < 1e-12);
        assert!((scores[&GeometryId(2)] - 0.5).abs() < 1e-12);
        assert_eq!(scores[&GeometryId(3)], 1.0);
    }

    #[tokio::test]
    async fn test_tiles_fetched_once_across_geometries() {
        let agg = aggregator(&[(0, 10), (1, 20)]);
        let geometries: Vec<Geometry> = (0..50).map(|id| way(id, &[0, 1, 0])).collect();
        agg.aggregate(&geometries).await;

        assert_eq!(agg.cache().len(), 2);
        assert_eq!(agg.metrics.snapshot().tiles_fetched, 2);
    }

    #[tokio::test]
    async fn test_non_finite_vertex_is_no_data() {
        let agg = aggregator(&[(0, 255)]);
        assert_eq!(agg.sample_vertex(GeoPoint::new(f64::NAN, 0.0)).await, None);
    }

    #[test]
    fn test_invalid_zoom_rejected() {
        let metrics = Arc::new(RunMetrics::new());
        let cache = TileCache::new(
            ColumnProvider {
                values: HashMap::new(),
            },
            ColorMode::Luma,
            TileCacheConfig::default(),
            Arc::clone(&metrics),
        );
        let result =
            GeometryAggregator::new(Projector::default(), 40, ValueSampler::Grayscale, cache, metrics);
        assert!(matches!(result, Err(CoordError::InvalidZoom(40))));
    }
}
