//! Road-network geometries.
//!
//! A [`Geometry`] is the ordered vertex list of one way, keyed by its stable
//! database id. Multi-part geometries are flattened in order; the aggregator
//! only cares about the set of vertices, not about topology.

mod geojson;

pub use geojson::{parse_geojson, GeoJsonError};

use std::fmt;

use crate::coord::GeoPoint;

/// Stable external key of a geometry (the `gid` column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(pub i64);

impl fmt::Display for GeometryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for GeometryId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// One geometry to score.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub id: GeometryId,
    pub vertices: Vec<GeoPoint>,
}

impl Geometry {
    pub fn new(id: i64, vertices: Vec<GeoPoint>) -> Self {
        Self {
            id: GeometryId(id),
            vertices,
        }
    }

    /// Builds a geometry from `(lng, lat)` pairs.
    pub fn from_coords(id: i64, coords: &[(f64, f64)]) -> Self {
        Self::new(
            id,
            coords
                .iter()
                .map(|&(lng, lat)| GeoPoint::new(lng, lat))
                .collect(),
        )
    }
}
