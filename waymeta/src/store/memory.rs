//! In-process store for tests and dry runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::{GeometrySource, Identifier, MetadataSink, StoreError};
use crate::geom::{Geometry, GeometryId};

/// Keeps geometries and metadata records in memory.
///
/// Each metric is its own column: upserting one metric never touches the
/// values of another.
#[derive(Debug, Default)]
pub struct MemoryStore {
    geometries: Vec<Geometry>,
    columns: Mutex<HashMap<Identifier, HashMap<GeometryId, f64>>>,
    reject_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new(geometries: Vec<Geometry>) -> Self {
        Self {
            geometries,
            ..Default::default()
        }
    }

    /// Makes every following upsert fail, simulating a database outage.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Stored value of `metric` for one geometry.
    pub fn value(&self, metric: &Identifier, id: GeometryId) -> Option<f64> {
        self.columns.lock().get(metric)?.get(&id).copied()
    }

    /// All stored values of one metric.
    pub fn column(&self, metric: &Identifier) -> HashMap<GeometryId, f64> {
        self.columns
            .lock()
            .get(metric)
            .cloned()
            .unwrap_or_default()
    }
}

impl GeometrySource for MemoryStore {
    async fn load_geometries(&self) -> Result<Vec<Geometry>, StoreError> {
        Ok(self.geometries.clone())
    }
}

impl MetadataSink for MemoryStore {
    async fn upsert(
        &self,
        metric: &Identifier,
        values: &HashMap<GeometryId, f64>,
    ) -> Result<u64, StoreError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected(format!(
                "writes to {} are disabled",
                metric
            )));
        }

        // One lock for the whole batch, so readers never see half of it
        let mut columns = self.columns.lock();
        let column = columns.entry(metric.clone()).or_default();
        column.extend(values.iter().map(|(id, value)| (*id, *value)));
        Ok(values.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(name: &str) -> Identifier {
        Identifier::new(name).unwrap()
    }

    #[tokio::test]
    async fn test_load_returns_geometries() {
        let store = MemoryStore::new(vec![Geometry::from_coords(7, &[(1.0, 2.0)])]);
        let loaded = store.load_geometries().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, GeometryId(7));
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_overwrites() {
        let store = MemoryStore::default();
        let popularity = metric("popularity");

        let first: HashMap<GeometryId, f64> = [(GeometryId(1), 0.5), (GeometryId(2), 1.0)].into();
        assert_eq!(store.upsert(&popularity, &first).await.unwrap(), 2);

        let second: HashMap<GeometryId, f64> = [(GeometryId(1), 0.75)].into();
        store.upsert(&popularity, &second).await.unwrap();

        assert_eq!(store.value(&popularity, GeometryId(1)), Some(0.75));
        assert_eq!(store.value(&popularity, GeometryId(2)), Some(1.0));
    }

    #[tokio::test]
    async fn test_metrics_are_independent_columns() {
        let store = MemoryStore::default();
        let values: HashMap<GeometryId, f64> = [(GeometryId(1), 0.3)].into();
        store.upsert(&metric("popularity"), &values).await.unwrap();

        let values: HashMap<GeometryId, f64> = [(GeometryId(1), 0.9)].into();
        store.upsert(&metric("greenery"), &values).await.unwrap();

        assert_eq!(store.value(&metric("popularity"), GeometryId(1)), Some(0.3));
        assert_eq!(store.value(&metric("greenery"), GeometryId(1)), Some(0.9));
    }

    #[tokio::test]
    async fn test_rejected_write_leaves_no_state() {
        let store = MemoryStore::default();
        store.reject_writes(true);

        let values: HashMap<GeometryId, f64> = [(GeometryId(1), 0.3)].into();
        let result = store.upsert(&metric("popularity"), &values).await;

        assert!(matches!(result, Err(StoreError::Rejected(_))));
        assert!(store.column(&metric("popularity")).is_empty());
    }
}
