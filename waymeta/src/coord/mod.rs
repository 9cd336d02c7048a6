//! Coordinate conversion module
//!
//! Converts geographic coordinates (longitude/latitude) into the projected
//! pixel space shared by XYZ raster tile services, and from there into a tile
//! index plus the pixel offset inside that tile.
//!
//! The projection is the spherical Web Mercator transform expressed in tile
//! pixel units at zoom 0, so a projected point is zoom-independent and the
//! tile/pixel split for any zoom is a scale plus one floor.

mod types;

pub use types::{
    CoordError, GeoPoint, PixelOffset, ProjectedPoint, TileIndex, CLAMP_LAT, DEFAULT_TILE_SIZE,
    MAX_SIN_LAT, MAX_ZOOM,
};

use std::f64::consts::PI;

/// Projects geographic points into tile pixel space for a fixed tile size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projector {
    tile_size: u32,
}

impl Projector {
    /// Creates a projector for tiles of `tile_size` × `tile_size` pixels.
    pub fn new(tile_size: u32) -> Result<Self, CoordError> {
        if tile_size == 0 {
            return Err(CoordError::InvalidTileSize(tile_size));
        }
        Ok(Self { tile_size })
    }

    /// Edge length of a tile in pixels.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Projects a geographic point into the zoom-0 pixel square.
    ///
    /// `sin(lat)` is clamped to `±MAX_SIN_LAT` so points at or near the poles
    /// land slightly past the top/bottom edge instead of at infinity.
    #[inline]
    pub fn project(&self, point: GeoPoint) -> ProjectedPoint {
        let size = f64::from(self.tile_size);
        let sin_lat = (point.lat * PI / 180.0)
            .sin()
            .clamp(-MAX_SIN_LAT, MAX_SIN_LAT);

        ProjectedPoint {
            x: size * (0.5 + point.lng / 360.0),
            y: size * (0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * PI)),
        }
    }

    /// Splits a projected point into a tile index and in-tile pixel offset.
    ///
    /// The column wraps around the antimeridian. Rows past the top or bottom
    /// edge of the world (possible above ~85.05° because of the latitude
    /// clamp) snap to the nearest edge pixel row.
    #[inline]
    pub fn to_tile_index(
        &self,
        point: ProjectedPoint,
        zoom: u8,
    ) -> Result<(TileIndex, PixelOffset), CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }

        let tiles = 1i64 << zoom;
        let scale = tiles as f64;

        let (col, pixel_x) = self.split_axis(point.x * scale);
        let col = col.rem_euclid(tiles);

        let (row, pixel_y) = self.split_axis(point.y * scale);
        let (row, pixel_y) = if row < 0 {
            (0, 0)
        } else if row >= tiles {
            (tiles - 1, self.tile_size - 1)
        } else {
            (row, pixel_y)
        };

        Ok((
            TileIndex {
                x: col as u32,
                y: row as u32,
                zoom,
            },
            PixelOffset::new(pixel_x, pixel_y),
        ))
    }

    /// Resolves a geographic point straight to its tile and pixel.
    #[inline]
    pub fn locate(&self, point: GeoPoint, zoom: u8) -> Result<(TileIndex, PixelOffset), CoordError> {
        self.to_tile_index(self.project(point), zoom)
    }

    /// Floor-divides a scaled coordinate into (tile, pixel).
    ///
    /// The pixel is the remainder against the same floored tile, so negative
    /// inputs never produce an off-by-one tile boundary.
    fn split_axis(&self, scaled: f64) -> (i64, u32) {
        let size = f64::from(self.tile_size);
        let tile = (scaled / size).floor();
        let pixel = (scaled - tile * size).floor().clamp(0.0, size - 1.0);
        (tile as i64, pixel as u32)
    }
}

impl Default for Projector {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}
