//! Coordinate types used by the projector.

use std::fmt;

use thiserror::Error;

/// Largest `sin(latitude)` magnitude accepted by the projection.
///
/// Values beyond this are clamped, which caps usable latitude at roughly
/// ±89.19°. That is about a third of a tile past the edge of the world tile.
pub const MAX_SIN_LAT: f64 = 0.9999;

/// Latitude (degrees) at which the projection starts clamping.
pub const CLAMP_LAT: f64 = 89.189_708_562_934_36;

/// Maximum supported zoom level.
///
/// At zoom 30 a 512px tile grid spans 2^39 pixels, still exact in `f64`.
pub const MAX_ZOOM: u8 = 30;

/// Default edge length of a raster tile, in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// A geographic point in degrees (EPSG:4326 axis order lng, lat).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

/// A point in the flat world square, measured in tile pixels at zoom 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
}

/// Identifies one raster tile in the XYZ (slippy map) scheme.
///
/// `x` grows west to east, `y` north to south, both in `[0, 2^zoom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileIndex {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

impl TileIndex {
    /// Creates a tile index, validating it against the tile grid at `zoom`.
    pub fn new(x: u32, y: u32, zoom: u8) -> Result<Self, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }
        let n = 1u64 << zoom;
        if u64::from(x) >= n || u64::from(y) >= n {
            return Err(CoordError::TileOutOfRange { x, y, zoom });
        }
        Ok(Self { x, y, zoom })
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Pixel position inside a tile, each component in `[0, tile_size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelOffset {
    pub x: u32,
    pub y: u32,
}

impl PixelOffset {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Errors from constructing projectors or tile indices.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("invalid zoom level {0} (max {MAX_ZOOM})")]
    InvalidZoom(u8),

    #[error("invalid tile size {0}")]
    InvalidTileSize(u32),

    #[error("tile {x}/{y} out of range at zoom {zoom}")]
    TileOutOfRange { x: u32, y: u32, zoom: u8 },
}
