//! Point-in-time view of run counters.

use std::fmt;
use std::time::Duration;

/// Copy of [`RunMetrics`](super::RunMetrics) taken at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub elapsed: Duration,
    pub geometries_total: u64,
    pub geometries_scored: u64,
    pub geometries_skipped: u64,
    pub vertices_sampled: u64,
    pub vertices_no_data: u64,
    pub tile_requests: u64,
    pub tiles_fetched: u64,
    pub bytes_downloaded: u64,
    pub fetch_failures: u64,
    pub decode_failures: u64,
    pub fetch_timeouts: u64,
    pub records_written: u64,
}

impl TelemetrySnapshot {
    /// Geometries finished so far, scored or skipped.
    pub fn geometries_processed(&self) -> u64 {
        self.geometries_scored + self.geometries_skipped
    }

    /// Progress as a fraction from 0.0 to 1.0.
    pub fn progress_fraction(&self) -> f64 {
        if self.geometries_total == 0 {
            return 1.0;
        }
        (self.geometries_processed() as f64 / self.geometries_total as f64).min(1.0)
    }

    /// Tiles that ended up as "no data", for any reason.
    pub fn tile_failures(&self) -> u64 {
        self.fetch_failures + self.decode_failures + self.fetch_timeouts
    }

    /// Distinct tiles resolved (fetched or failed).
    pub fn tiles_resolved(&self) -> u64 {
        self.tiles_fetched + self.tile_failures()
    }

    /// Fraction of tile lookups served without a fetch.
    pub fn cache_hit_rate(&self) -> f64 {
        if self.tile_requests == 0 {
            return 0.0;
        }
        let hits = self.tile_requests.saturating_sub(self.tiles_resolved());
        hits as f64 / self.tile_requests as f64
    }
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} geometries scored ({} skipped), {} tiles fetched ({} fetch errors, {} decode errors, {} timeouts), {:.1}% cache hits, {} records written in {:.1}s",
            self.geometries_scored,
            self.geometries_total,
            self.geometries_skipped,
            self.tiles_fetched,
            self.fetch_failures,
            self.decode_failures,
            self.fetch_timeouts,
            self.cache_hit_rate() * 100.0,
            self.records_written,
            self.elapsed.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_fraction_empty_run_is_complete() {
        assert_eq!(TelemetrySnapshot::default().progress_fraction(), 1.0);
    }

    #[test]
    fn test_progress_fraction_counts_skipped() {
        let snapshot = TelemetrySnapshot {
            geometries_total: 4,
            geometries_scored: 1,
            geometries_skipped: 1,
            ..Default::default()
        };
        assert_eq!(snapshot.progress_fraction(), 0.5);
    }

    #[test]
    fn test_cache_hit_rate() {
        let snapshot = TelemetrySnapshot {
            tile_requests: 10,
            tiles_fetched: 1,
            fetch_failures: 1,
            ..Default::default()
        };
        assert!((snapshot.cache_hit_rate() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_display_mentions_counts() {
        let snapshot = TelemetrySnapshot {
            geometries_total: 10,
            geometries_scored: 9,
            geometries_skipped: 1,
            fetch_timeouts: 3,
            ..Default::default()
        };
        let text = snapshot.to_string();
        assert!(text.contains("9/10 geometries scored"));
        assert!(text.contains("1 skipped"));
        assert!(text.contains("3 timeouts"));
    }
}
