//! Geometry source and metadata sink.
//!
//! The pipeline reads geometries from a [`GeometrySource`] and writes one
//! metric column per run through a [`MetadataSink`]. Both are traits so the
//! pipeline can run against PostGIS ([`PgStore`]) or an in-process
//! [`MemoryStore`].
//!
//! Upserts are last-write-wins per `(geometry id, metric)` and each batch is
//! applied atomically: a failed batch leaves no partial state behind and is
//! reported to the caller.

mod identifier;
mod memory;
mod postgres;

pub use identifier::{Identifier, TableName};
pub use memory::MemoryStore;
pub use postgres::{PgStore, PgStoreConfig, UPSERT_BATCH_SIZE};

use std::collections::HashMap;
use std::future::Future;

use thiserror::Error;

use crate::geom::{GeoJsonError, Geometry, GeometryId};

/// Errors from reading geometries or writing metadata.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid SQL identifier {0:?}")]
    InvalidIdentifier(String),

    #[error("geometry {gid}: {source}")]
    Geometry {
        gid: i64,
        #[source]
        source: GeoJsonError,
    },

    #[error("store rejected the write: {0}")]
    Rejected(String),
}

/// Supplies the geometries to score.
pub trait GeometrySource: Send + Sync {
    /// Loads every geometry. The count doubles as the progress total.
    fn load_geometries(&self) -> impl Future<Output = Result<Vec<Geometry>, StoreError>> + Send;
}

/// Persists per-geometry metric values.
pub trait MetadataSink: Send + Sync {
    /// Inserts or overwrites `metric` for every geometry in `values`,
    /// atomically. Returns the number of records written.
    fn upsert(
        &self,
        metric: &Identifier,
        values: &HashMap<GeometryId, f64>,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;
}
