//! Memoizing tile fetcher.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, instrument, warn};

use crate::coord::TileIndex;
use crate::provider::{AsyncProvider, ProviderError, DEFAULT_TIMEOUT};
use crate::raster::{ColorMode, DecodeError, Raster};
use crate::telemetry::RunMetrics;

/// Default number of tile downloads allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 16;

/// Why a tile has no raster.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NoData {
    #[error("fetch failed: {0}")]
    FetchFailed(#[from] ProviderError),

    #[error(transparent)]
    DecodeFailed(#[from] DecodeError),

    #[error("fetch timed out after {0:?}")]
    TimedOut(Duration),
}

/// Outcome of a cache lookup.
pub type TileResult = Result<Arc<Raster>, NoData>;

/// Tuning for the tile cache.
#[derive(Debug, Clone)]
pub struct TileCacheConfig {
    /// Upper bound on a single download, on top of the HTTP client's own.
    pub fetch_timeout: Duration,
    /// Maximum concurrent downloads against the tile server.
    pub max_concurrent_fetches: usize,
}

impl Default for TileCacheConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_TIMEOUT,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

/// Memoizing fetcher mapping tile indices to decoded rasters.
///
/// One slot per tile is created on first lookup; the first caller fills it
/// and concurrent callers for the same tile wait on that fill instead of
/// issuing their own request.
pub struct TileCache<P: AsyncProvider> {
    provider: P,
    color_mode: ColorMode,
    entries: DashMap<TileIndex, Arc<OnceCell<TileResult>>>,
    fetch_limiter: Semaphore,
    fetch_timeout: Duration,
    metrics: Arc<RunMetrics>,
}

impl<P: AsyncProvider> TileCache<P> {
    /// Creates an empty cache converting fetched tiles to `color_mode`.
    pub fn new(
        provider: P,
        color_mode: ColorMode,
        config: TileCacheConfig,
        metrics: Arc<RunMetrics>,
    ) -> Self {
        Self {
            provider,
            color_mode,
            entries: DashMap::new(),
            fetch_limiter: Semaphore::new(config.max_concurrent_fetches.max(1)),
            fetch_timeout: config.fetch_timeout,
            metrics,
        }
    }

    /// Returns the raster for `tile`, fetching it only if it has never been
    /// requested before in this run.
    pub async fn get(&self, tile: TileIndex) -> TileResult {
        self.metrics.tile_requested();

        // Clone the slot out so the map shard is not held across the fetch
        let slot = Arc::clone(&*self.entries.entry(tile).or_default());

        slot.get_or_init(|| self.fetch(tile)).await.clone()
    }

    /// Number of distinct tiles looked up so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    #[instrument(skip(self), fields(provider = %self.provider.name()))]
    async fn fetch(&self, tile: TileIndex) -> TileResult {
        // The semaphore is never closed, so a failed acquire cannot happen
        let _permit = self.fetch_limiter.acquire().await.ok();

        let bytes =
            match tokio::time::timeout(self.fetch_timeout, self.provider.download_tile(tile)).await
            {
                Ok(Ok(bytes)) => bytes,
                Ok(Err(e)) => {
                    warn!(%tile, error = %e, "Tile fetch failed, treating as no data");
                    self.metrics.fetch_failed();
                    return Err(NoData::FetchFailed(e));
                }
                Err(_) => {
                    warn!(%tile, timeout = ?self.fetch_timeout, "Tile fetch timed out, treating as no data");
                    self.metrics.fetch_timed_out();
                    return Err(NoData::TimedOut(self.fetch_timeout));
                }
            };

        let size = bytes.len() as u64;
        let mode = self.color_mode;
        let decoded = tokio::task::spawn_blocking(move || Raster::decode(&bytes, mode))
            .await
            .unwrap_or_else(|e| Err(DecodeError(format!("decode task failed: {}", e))));

        match decoded {
            Ok(raster) => {
                debug!(
                    %tile,
                    size_bytes = size,
                    width = raster.width(),
                    height = raster.height(),
                    "Tile cached"
                );
                self.metrics.tile_fetched(size);
                Ok(Arc::new(raster))
            }
            Err(e) => {
                warn!(%tile, error = %e, "Tile decode failed, treating as no data");
                self.metrics.decode_failed();
                Err(NoData::DecodeFailed(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockAsyncHttpClient, TemplateProvider, UrlTemplate};
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    fn gray_png(value: u8) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([value])))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn cache_with(
        client: MockAsyncHttpClient,
        config: TileCacheConfig,
    ) -> TileCache<TemplateProvider<MockAsyncHttpClient>> {
        let template = UrlTemplate::parse("https://tiles.test/${z}/${x}/${y}.png").unwrap();
        let provider = TemplateProvider::new("test", template, client);
        TileCache::new(provider, ColorMode::Luma, config, Arc::new(RunMetrics::new()))
    }

    fn tile(x: u32, y: u32) -> TileIndex {
        TileIndex::new(x, y, 12).unwrap()
    }

    #[tokio::test]
    async fn test_repeated_lookups_fetch_once() {
        let cache = cache_with(
            MockAsyncHttpClient::new(Ok(gray_png(200))),
            TileCacheConfig::default(),
        );

        for _ in 0..10 {
            let raster = cache.get(tile(1, 2)).await.unwrap();
            assert_eq!(raster.width(), 8);
        }

        assert_eq!(cache.provider().http_client().request_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_tiles_fetch_separately() {
        let cache = cache_with(
            MockAsyncHttpClient::new(Ok(gray_png(1))),
            TileCacheConfig::default(),
        );

        cache.get(tile(1, 2)).await.unwrap();
        cache.get(tile(2, 1)).await.unwrap();
        cache.get(tile(1, 2)).await.unwrap();

        assert_eq!(
            cache.provider().http_client().requested_urls(),
            vec![
                "https://tiles.test/12/1/2.png",
                "https://tiles.test/12/2/1.png"
            ]
        );
    }

    #[tokio::test]
    async fn test_concurrent_lookups_coalesce() {
        let client =
            MockAsyncHttpClient::new(Ok(gray_png(7))).with_delay(Duration::from_millis(20));
        let cache = cache_with(client, TileCacheConfig::default());

        let lookups = (0..32).map(|_| cache.get(tile(5, 5)));
        let results = futures::future::join_all(lookups).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(cache.provider().http_client().request_count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_cached_as_no_data() {
        let error = ProviderError::HttpStatus {
            status: 404,
            url: "https://tiles.test/12/1/2.png".to_string(),
        };
        let cache = cache_with(
            MockAsyncHttpClient::new(Err(error.clone())),
            TileCacheConfig::default(),
        );

        assert_eq!(cache.get(tile(1, 2)).await, Err(NoData::FetchFailed(error.clone())));
        assert_eq!(cache.get(tile(1, 2)).await, Err(NoData::FetchFailed(error)));
        assert_eq!(cache.provider().http_client().request_count(), 1);
        assert_eq!(cache.metrics.snapshot().fetch_failures, 1);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_decode_failure() {
        let cache = cache_with(
            MockAsyncHttpClient::new(Ok(b"<html>rate limited</html>".to_vec())),
            TileCacheConfig::default(),
        );

        let result = cache.get(tile(1, 2)).await;
        assert!(matches!(result, Err(NoData::DecodeFailed(_))));
        assert_eq!(cache.metrics.snapshot().decode_failures, 1);
    }

    #[tokio::test]
    async fn test_hung_fetch_times_out() {
        let client = MockAsyncHttpClient::new(Ok(gray_png(1))).with_delay(Duration::from_secs(30));
        let config = TileCacheConfig {
            fetch_timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let cache = cache_with(client, config);

        let result = cache.get(tile(1, 2)).await;
        assert_eq!(result, Err(NoData::TimedOut(Duration::from_millis(20))));
        assert_eq!(cache.metrics.snapshot().fetch_timeouts, 1);
    }

    #[tokio::test]
    async fn test_tile_is_converted_to_color_mode() {
        let template = UrlTemplate::parse("https://tiles.test/${z}/${x}/${y}.png").unwrap();
        let provider = TemplateProvider::new(
            "test",
            template,
            MockAsyncHttpClient::new(Ok(gray_png(50))),
        );
        let cache = TileCache::new(
            provider,
            ColorMode::Rgb,
            TileCacheConfig::default(),
            Arc::new(RunMetrics::new()),
        );

        let raster = cache.get(tile(0, 0)).await.unwrap();
        assert_eq!(raster.color_mode(), ColorMode::Rgb);
    }
}
