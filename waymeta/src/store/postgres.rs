//! PostGIS-backed store using sqlx.

use std::collections::HashMap;

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::{debug, info, warn};

use super::{GeometrySource, Identifier, MetadataSink, StoreError, TableName};
use crate::geom::{parse_geojson, Geometry, GeometryId};

/// Rows per `INSERT ... VALUES` statement inside an upsert transaction.
///
/// Two bind parameters per row keeps each statement well under the
/// PostgreSQL limit of 65535 parameters.
pub const UPSERT_BATCH_SIZE: usize = 1000;

/// Where geometries are read from and metadata is written to.
#[derive(Debug, Clone)]
pub struct PgStoreConfig {
    /// Table holding the road geometries (`gid`, geometry column).
    pub ways_table: TableName,
    /// Geometry column of `ways_table`.
    pub geometry_column: Identifier,
    /// Table receiving one column per metric, keyed by `gid`.
    pub metadata_table: TableName,
    /// Connection pool size.
    pub max_connections: u32,
}

impl Default for PgStoreConfig {
    fn default() -> Self {
        Self {
            ways_table: Identifier::from_static("ways").into(),
            geometry_column: Identifier::from_static("the_geom"),
            metadata_table: Identifier::from_static("ways_metadata").into(),
            max_connections: 4,
        }
    }
}

/// Geometry source and metadata sink backed by a PostgreSQL pool.
pub struct PgStore {
    pool: PgPool,
    config: PgStoreConfig,
}

impl PgStore {
    /// Connects a pool to `url`.
    pub async fn connect(url: &str, config: PgStoreConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await?;
        info!(ways = %config.ways_table, metadata = %config.metadata_table, "Connected to database");
        Ok(Self::new(pool, config))
    }

    /// Wraps an existing pool.
    pub fn new(pool: PgPool, config: PgStoreConfig) -> Self {
        Self { pool, config }
    }

    fn select_sql(&self) -> String {
        format!(
            "SELECT gid::bigint, ST_AsGeoJSON({}) FROM {}",
            self.config.geometry_column, self.config.ways_table
        )
    }

    fn insert_prefix(&self, metric: &Identifier) -> String {
        format!(
            "INSERT INTO {} (gid, {}) ",
            self.config.metadata_table, metric
        )
    }

    fn conflict_suffix(metric: &Identifier) -> String {
        format!(" ON CONFLICT (gid) DO UPDATE SET {0} = excluded.{0}", metric)
    }

    /// One `INSERT ... ON CONFLICT` statement per `UPSERT_BATCH_SIZE` rows,
    /// ordered by geometry id.
    fn upsert_batches(
        &self,
        metric: &Identifier,
        values: &HashMap<GeometryId, f64>,
    ) -> Vec<QueryBuilder<'static, Postgres>> {
        let mut entries: Vec<(GeometryId, f64)> =
            values.iter().map(|(id, value)| (*id, *value)).collect();
        entries.sort_unstable_by_key(|(id, _)| *id);

        entries
            .chunks(UPSERT_BATCH_SIZE)
            .map(|chunk| {
                let mut builder = QueryBuilder::new(self.insert_prefix(metric));
                builder.push_values(chunk, |mut row, (id, value)| {
                    row.push_bind(id.0).push_bind(*value);
                });
                builder.push(Self::conflict_suffix(metric));
                builder
            })
            .collect()
    }
}

impl GeometrySource for PgStore {
    async fn load_geometries(&self) -> Result<Vec<Geometry>, StoreError> {
        let sql = self.select_sql();
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut geometries = Vec::with_capacity(rows.len());
        for row in rows {
            let gid: i64 = row.try_get(0)?;
            let geojson: Option<String> = row.try_get(1)?;
            let Some(geojson) = geojson else {
                warn!(gid, "Geometry is NULL, skipping");
                continue;
            };
            let vertices =
                parse_geojson(&geojson).map_err(|source| StoreError::Geometry { gid, source })?;
            geometries.push(Geometry::new(gid, vertices));
        }

        info!(count = geometries.len(), table = %self.config.ways_table, "Loaded geometries");
        Ok(geometries)
    }
}

impl MetadataSink for PgStore {
    async fn upsert(
        &self,
        metric: &Identifier,
        values: &HashMap<GeometryId, f64>,
    ) -> Result<u64, StoreError> {
        info!(table = %self.config.metadata_table, column = %metric, rows = values.len(), "Upserting metadata");

        let batches = self.upsert_batches(metric, values);

        // Dropping the transaction on error rolls it back
        let mut tx = self.pool.begin().await?;
        let mut written = 0;
        for (batch, mut builder) in batches.into_iter().enumerate() {
            let result = builder.build().execute(&mut *tx).await?;
            written += result.rows_affected();
            debug!(batch, rows = result.rows_affected(), "Upsert batch executed");
        }
        tx.commit().await?;

        Ok(written)
    }
}
