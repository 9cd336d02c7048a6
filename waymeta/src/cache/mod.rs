//! Per-run tile cache.
//!
//! Every vertex of every geometry resolves to a tile, and neighboring
//! vertices almost always share one. The [`TileCache`] guarantees that each
//! distinct [`TileIndex`](crate::coord::TileIndex) is fetched and decoded at
//! most once per run, including under concurrent lookups, and remembers
//! failures as [`NoData`] so a broken tile is not retried for every vertex.
//!
//! The cache never evicts. Memory use is bounded by the number of distinct
//! tiles a run touches, which for a regional road network at zoom 12-15 is in
//! the thousands.

mod tile;

pub use tile::{NoData, TileCache, TileCacheConfig, TileResult, DEFAULT_MAX_CONCURRENT_FETCHES};
