//! Atomic counters for one run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::TelemetrySnapshot;

/// Counters shared between the pipeline stages and any progress view.
#[derive(Debug)]
pub struct RunMetrics {
    started_at: Instant,

    geometries_total: AtomicU64,
    geometries_scored: AtomicU64,
    geometries_skipped: AtomicU64,

    vertices_sampled: AtomicU64,
    vertices_no_data: AtomicU64,

    tile_requests: AtomicU64,
    tiles_fetched: AtomicU64,
    bytes_downloaded: AtomicU64,
    fetch_failures: AtomicU64,
    decode_failures: AtomicU64,
    fetch_timeouts: AtomicU64,

    records_written: AtomicU64,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            geometries_total: AtomicU64::new(0),
            geometries_scored: AtomicU64::new(0),
            geometries_skipped: AtomicU64::new(0),
            vertices_sampled: AtomicU64::new(0),
            vertices_no_data: AtomicU64::new(0),
            tile_requests: AtomicU64::new(0),
            tiles_fetched: AtomicU64::new(0),
            bytes_downloaded: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            fetch_timeouts: AtomicU64::new(0),
            records_written: AtomicU64::new(0),
        }
    }

    /// Records how many geometries the source returned.
    pub fn geometries_loaded(&self, count: u64) {
        self.geometries_total.store(count, Ordering::Relaxed);
    }

    pub fn geometry_scored(&self) {
        self.geometries_scored.fetch_add(1, Ordering::Relaxed);
    }

    /// A geometry whose every vertex had no data.
    pub fn geometry_skipped(&self) {
        self.geometries_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn vertex_sampled(&self) {
        self.vertices_sampled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn vertex_no_data(&self) {
        self.vertices_no_data.fetch_add(1, Ordering::Relaxed);
    }

    /// Every tile cache lookup, hit or miss.
    pub fn tile_requested(&self) {
        self.tile_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// A tile downloaded and decoded successfully.
    pub fn tile_fetched(&self, bytes: u64) {
        self.tiles_fetched.fetch_add(1, Ordering::Relaxed);
        self.bytes_downloaded.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn fetch_failed(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decode_failed(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_timed_out(&self) {
        self.fetch_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn records_written(&self, count: u64) {
        self.records_written.fetch_add(count, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of all counters.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            elapsed: self.started_at.elapsed(),
            geometries_total: self.geometries_total.load(Ordering::Relaxed),
            geometries_scored: self.geometries_scored.load(Ordering::Relaxed),
            geometries_skipped: self.geometries_skipped.load(Ordering::Relaxed),
            vertices_sampled: self.vertices_sampled.load(Ordering::Relaxed),
            vertices_no_data: self.vertices_no_data.load(Ordering::Relaxed),
            tile_requests: self.tile_requests.load(Ordering::Relaxed),
            tiles_fetched: self.tiles_fetched.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            fetch_timeouts: self.fetch_timeouts.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
        }
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let snapshot = RunMetrics::new().snapshot();
        assert_eq!(snapshot.geometries_total, 0);
        assert_eq!(snapshot.tiles_fetched, 0);
        assert_eq!(snapshot.records_written, 0);
    }

    #[test]
    fn test_counters_accumulate() {
        let metrics = RunMetrics::new();
        metrics.geometries_loaded(3);
        metrics.geometry_scored();
        metrics.geometry_scored();
        metrics.geometry_skipped();
        metrics.tile_fetched(1000);
        metrics.tile_fetched(500);
        metrics.fetch_failed();
        metrics.fetch_timed_out();
        metrics.records_written(2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.geometries_total, 3);
        assert_eq!(snapshot.geometries_scored, 2);
        assert_eq!(snapshot.geometries_skipped, 1);
        assert_eq!(snapshot.tiles_fetched, 2);
        assert_eq!(snapshot.bytes_downloaded, 1500);
        assert_eq!(snapshot.tile_failures(), 2);
        assert_eq!(snapshot.records_written, 2);
    }
}
