//! Minimal GeoJSON geometry reader.
//!
//! PostGIS hands geometries over as `ST_AsGeoJSON(...)` text. Only the
//! coordinate arrays matter here, so each supported type is flattened into
//! one ordered vertex list.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::coord::GeoPoint;

/// Errors from reading a GeoJSON geometry.
#[derive(Debug, Error)]
pub enum GeoJsonError {
    #[error("invalid GeoJSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported geometry type {0}")]
    UnsupportedType(String),

    #[error("malformed coordinates for {0}")]
    MalformedCoordinates(String),
}

#[derive(Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Value,
}

/// Parses a GeoJSON geometry object into its flattened vertex list.
///
/// Supports `Point`, `MultiPoint`, `LineString`, `MultiLineString`,
/// `Polygon` and `MultiPolygon`.
pub fn parse_geojson(text: &str) -> Result<Vec<GeoPoint>, GeoJsonError> {
    let raw: RawGeometry = serde_json::from_str(text)?;

    // Nesting depth of position arrays for each type
    let depth = match raw.kind.as_str() {
        "Point" => 0,
        "MultiPoint" | "LineString" => 1,
        "MultiLineString" | "Polygon" => 2,
        "MultiPolygon" => 3,
        _ => return Err(GeoJsonError::UnsupportedType(raw.kind)),
    };

    let mut vertices = Vec::new();
    if !collect_positions(&raw.coordinates, depth, &mut vertices) {
        return Err(GeoJsonError::MalformedCoordinates(raw.kind));
    }
    Ok(vertices)
}

fn collect_positions(value: &Value, depth: usize, out: &mut Vec<GeoPoint>) -> bool {
    if depth == 0 {
        return match position(value) {
            Some(point) => {
                out.push(point);
                true
            }
            None => false,
        };
    }
    match value.as_array() {
        Some(items) => items
            .iter()
            .all(|item| collect_positions(item, depth - 1, out)),
        None => false,
    }
}

fn position(value: &Value) -> Option<GeoPoint> {
    let coords = value.as_array()?;
    let lng = coords.first()?.as_f64()?;
    let lat = coords.get(1)?.as_f64()?;
    Some(GeoPoint::new(lng, lat))
}
