//! Value extraction from decoded tiles.
//!
//! Each data source turns the pixel under a vertex into one scalar. The set of
//! strategies is closed: a data source picks one [`ValueSampler`] variant when
//! its pipeline is built, and the variant also decides which color mode its
//! tiles are converted to.

use crate::coord::PixelOffset;
use crate::raster::{ColorMode, Raster};

/// Half-width of the neighborhood averaged by the greenery sampler.
pub const GREENERY_RADIUS: u32 = 10;

/// Green excess (0-255 scale) that maps to a greenery value of 1.0.
pub const GREENERY_SCALE: f64 = 200.0;

/// Scalar extraction strategy for one data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSampler {
    /// Pixel brightness normalized to `[0, 1]`. Used for heatmap tiles.
    Grayscale,
    /// Vegetation heuristic on satellite imagery: how much green exceeds the
    /// stronger of red and blue, averaged over a small neighborhood.
    Greenery,
}

impl ValueSampler {
    /// Extracts the scalar for `pixel`, always in `[0, 1]`.
    pub fn sample(&self, raster: &Raster, pixel: PixelOffset) -> f64 {
        match self {
            ValueSampler::Grayscale => f64::from(raster.intensity(pixel)) / 255.0,
            ValueSampler::Greenery => greenery(raster, pixel),
        }
    }

    /// Color mode tiles are converted to before sampling.
    pub fn color_mode(&self) -> ColorMode {
        match self {
            ValueSampler::Grayscale => ColorMode::Luma,
            ValueSampler::Greenery => ColorMode::Rgb,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueSampler::Grayscale => "grayscale",
            ValueSampler::Greenery => "greenery",
        }
    }
}

fn greenery(raster: &Raster, pixel: PixelOffset) -> f64 {
    let (x, y) = raster.clamp_pixel(pixel);
    // Averaging damps single-pixel noise in the imagery
    let [r, g, b] = raster.mean_rgb(
        x.saturating_sub(GREENERY_RADIUS),
        y.saturating_sub(GREENERY_RADIUS),
        x + GREENERY_RADIUS,
        y + GREENERY_RADIUS,
    );
    ((g - r.max(b)).max(0.0) / GREENERY_SCALE).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn uniform_gray(value: u8) -> Raster {
        Raster::Luma(GrayImage::from_pixel(256, 256, Luma([value])))
    }

    fn uniform_rgb(rgb: [u8; 3]) -> Raster {
        Raster::Rgb(RgbImage::from_pixel(256, 256, Rgb(rgb)))
    }

    #[test]
    fn test_grayscale_extremes() {
        let pixel = PixelOffset::new(17, 200);
        assert_eq!(ValueSampler::Grayscale.sample(&uniform_gray(255), pixel), 1.0);
        assert_eq!(ValueSampler::Grayscale.sample(&uniform_gray(0), pixel), 0.0);
    }

    #[test]
    fn test_grayscale_midpoint() {
        let value = ValueSampler::Grayscale.sample(&uniform_gray(128), PixelOffset::new(0, 0));
        assert!((value - 128.0 / 255.0).abs() < 1e-12);
    }

    #[test]
    fn test_greenery_pure_green_saturates() {
        let raster = uniform_rgb([0, 200, 0]);
        assert_eq!(ValueSampler::Greenery.sample(&raster, PixelOffset::new(128, 128)), 1.0);

        let raster = uniform_rgb([0, 255, 0]);
        assert_eq!(ValueSampler::Greenery.sample(&raster, PixelOffset::new(128, 128)), 1.0);
    }

    #[test]
    fn test_greenery_gray_is_zero() {
        let raster = uniform_rgb([90, 90, 90]);
        assert_eq!(ValueSampler::Greenery.sample(&raster, PixelOffset::new(5, 250)), 0.0);
    }

    #[test]
    fn test_greenery_red_dominant_is_zero() {
        let raster = uniform_rgb([200, 100, 0]);
        assert_eq!(ValueSampler::Greenery.sample(&raster, PixelOffset::new(5, 5)), 0.0);
    }

    #[test]
    fn test_greenery_partial() {
        // g - max(r, b) = 150 - 50 = 100 -> 0.5
        let raster = uniform_rgb([50, 150, 20]);
        assert_eq!(ValueSampler::Greenery.sample(&raster, PixelOffset::new(100, 100)), 0.5);
    }

    #[test]
    fn test_greenery_averages_neighborhood() {
        // A single green pixel in a gray field is diluted by its neighbors
        let mut img = RgbImage::from_pixel(256, 256, Rgb([0, 0, 0]));
        img.put_pixel(100, 100, Rgb([0, 200, 0]));
        let raster = Raster::Rgb(img);

        let value = ValueSampler::Greenery.sample(&raster, PixelOffset::new(100, 100));
        assert!((value - 1.0 / 400.0).abs() < 1e-12, "got {}", value);
    }

    #[test]
    fn test_greenery_neighborhood_clamped_at_corner() {
        // At the corner only a 10x10 box is inside the tile
        let mut img = RgbImage::from_pixel(256, 256, Rgb([0, 0, 0]));
        for y in 0..10 {
            for x in 0..10 {
                img.put_pixel(x, y, Rgb([0, 200, 0]));
            }
        }
        let raster = Raster::Rgb(img);
        assert_eq!(ValueSampler::Greenery.sample(&raster, PixelOffset::new(0, 0)), 1.0);
    }

    #[test]
    fn test_color_modes() {
        assert_eq!(ValueSampler::Grayscale.color_mode(), ColorMode::Luma);
        assert_eq!(ValueSampler::Greenery.color_mode(), ColorMode::Rgb);
    }
}
