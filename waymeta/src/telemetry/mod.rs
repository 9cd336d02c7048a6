//! Run telemetry for observability and user feedback.
//!
//! This module provides metrics collection and reporting for one metadata
//! run. It uses lock-free atomic counters so the aggregator and tile cache can
//! record events from many concurrent tasks with minimal overhead.
//!
//! # Architecture
//!
//! ```text
//! Aggregator / TileCache ─────► RunMetrics ─────► TelemetrySnapshot ─────► Views
//!                              (atomic counters)  (point-in-time copy)     (CLI, logs)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use waymeta::telemetry::RunMetrics;
//! use std::sync::Arc;
//!
//! let metrics = Arc::new(RunMetrics::new());
//! metrics.geometries_loaded(1200);
//! metrics.geometry_scored();
//!
//! let snapshot = metrics.snapshot();
//! println!("{}", snapshot);
//! ```

mod metrics;
mod snapshot;

pub use metrics::RunMetrics;
pub use snapshot::TelemetrySnapshot;
