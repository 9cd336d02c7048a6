//! waymeta - Road-network metadata from raster tile services
//!
//! This library scores road geometries stored in a spatial database by
//! sampling raster tile services (activity heatmaps, satellite imagery) under
//! each vertex, and writes the normalized per-geometry scores back as
//! metadata columns.
//!
//! The pieces, leaf first:
//!
//! - [`coord`]: geographic point to tile index and pixel offset
//! - [`provider`]: tile download through a URL template and HTTP client
//! - [`raster`]: tile decoding into luma or RGB rasters
//! - [`cache`]: per-run memoizing tile fetcher
//! - [`sampler`]: raster pixel to scalar value
//! - [`aggregate`]: per-geometry median and normalization
//! - [`store`]: geometry source and metadata sink (PostGIS or in memory)
//! - [`pipeline`]: one complete run for one [`source`]

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod coord;
pub mod geom;
pub mod logging;
pub mod pipeline;
pub mod provider;
pub mod raster;
pub mod sampler;
pub mod source;
pub mod store;
pub mod telemetry;
