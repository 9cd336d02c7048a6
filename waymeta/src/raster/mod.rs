//! Decoded tile rasters.
//!
//! Tiles arrive as PNG/JPEG bytes and are decoded with the `image` crate,
//! then converted to the channel layout the sampler for that data source
//! reads: single-channel intensity (`Luma`) or three-channel color (`Rgb`).
//! Conversion happens once per tile at cache-fill time.

use image::{DynamicImage, GrayImage, RgbImage};
use thiserror::Error;

use crate::coord::PixelOffset;

/// Channel layout a tile is converted to after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// 8-bit intensity (ITU-R 601-2 luma for color sources).
    Luma,
    /// 8-bit RGB, alpha dropped.
    Rgb,
}

/// Error decoding a tile payload.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to decode tile: {0}")]
pub struct DecodeError(pub String);

/// A decoded tile, read-only once cached.
#[derive(Debug, Clone, PartialEq)]
pub enum Raster {
    Luma(GrayImage),
    Rgb(RgbImage),
}

impl Raster {
    /// Decodes encoded image bytes and converts them to `mode`.
    pub fn decode(bytes: &[u8], mode: ColorMode) -> Result<Self, DecodeError> {
        let image = image::load_from_memory(bytes).map_err(|e| DecodeError(e.to_string()))?;
        if image.width() == 0 || image.height() == 0 {
            return Err(DecodeError("empty image".to_string()));
        }
        Ok(Self::convert(image, mode))
    }

    /// Converts an already-decoded image to `mode`.
    pub fn convert(image: DynamicImage, mode: ColorMode) -> Self {
        match (mode, image) {
            (ColorMode::Luma, DynamicImage::ImageLuma8(gray)) => Raster::Luma(gray),
            (ColorMode::Luma, other) => {
                let rgb = other.to_rgb8();
                Raster::Luma(GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                    let [r, g, b] = rgb.get_pixel(x, y).0;
                    image::Luma([luma_601(r, g, b)])
                }))
            }
            (ColorMode::Rgb, other) => Raster::Rgb(other.to_rgb8()),
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            Raster::Luma(img) => img.width(),
            Raster::Rgb(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Raster::Luma(img) => img.height(),
            Raster::Rgb(img) => img.height(),
        }
    }

    pub fn color_mode(&self) -> ColorMode {
        match self {
            Raster::Luma(_) => ColorMode::Luma,
            Raster::Rgb(_) => ColorMode::Rgb,
        }
    }

    /// Clamps a pixel offset into the raster bounds.
    ///
    /// Servers occasionally return tiles of a different size than configured;
    /// reads then land on the nearest edge pixel.
    pub fn clamp_pixel(&self, pixel: PixelOffset) -> (u32, u32) {
        (
            pixel.x.min(self.width().saturating_sub(1)),
            pixel.y.min(self.height().saturating_sub(1)),
        )
    }

    /// Intensity at a pixel.
    pub fn intensity(&self, pixel: PixelOffset) -> u8 {
        let (x, y) = self.clamp_pixel(pixel);
        match self {
            Raster::Luma(img) => img.get_pixel(x, y).0[0],
            Raster::Rgb(img) => {
                let [r, g, b] = img.get_pixel(x, y).0;
                luma_601(r, g, b)
            }
        }
    }

    /// Mean color over the half-open box `[x0, x1) × [y0, y1)`.
    ///
    /// The box is intersected with the raster; an empty intersection yields
    /// black.
    pub fn mean_rgb(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> [f64; 3] {
        let x1 = x1.min(self.width());
        let y1 = y1.min(self.height());
        if x0 >= x1 || y0 >= y1 {
            return [0.0; 3];
        }

        let mut sum = [0u64; 3];
        for y in y0..y1 {
            for x in x0..x1 {
                let rgb = match self {
                    Raster::Luma(img) => {
                        let l = img.get_pixel(x, y).0[0];
                        [l, l, l]
                    }
                    Raster::Rgb(img) => img.get_pixel(x, y).0,
                };
                for (acc, channel) in sum.iter_mut().zip(rgb) {
                    *acc += u64::from(channel);
                }
            }
        }

        let count = f64::from(x1 - x0) * f64::from(y1 - y0);
        sum.map(|s| s as f64 / count)
    }
}

/// ITU-R 601-2 luma transform, `L = R * 299/1000 + G * 587/1000 + B * 114/1000`,
/// in 16-bit fixed point and rounded to nearest.
fn luma_601(r: u8, g: u8, b: u8) -> u8 {
    ((u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471 + 0x8000) >> 16) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode_png(image: DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_gray_png_as_luma() {
        let png = encode_png(DynamicImage::ImageLuma8(GrayImage::from_pixel(
            4,
            4,
            image::Luma([128]),
        )));
        let raster = Raster::decode(&png, ColorMode::Luma).unwrap();
        assert_eq!(raster.color_mode(), ColorMode::Luma);
        assert_eq!(raster.intensity(PixelOffset::new(2, 3)), 128);
    }

    #[test]
    fn test_decode_rgba_png_as_rgb_drops_alpha() {
        let png = encode_png(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            2,
            2,
            Rgba([10, 200, 30, 0]),
        )));
        let raster = Raster::decode(&png, ColorMode::Rgb).unwrap();
        assert_eq!(raster, Raster::Rgb(RgbImage::from_pixel(2, 2, Rgb([10, 200, 30]))));
    }

    #[test]
    fn test_color_to_luma_uses_601_weights() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([255, 0, 0])));
        let raster = Raster::convert(rgb, ColorMode::Luma);
        // 255 * 0.299 = 76.245
        assert_eq!(raster.intensity(PixelOffset::new(0, 0)), 76);
    }

    #[test]
    fn test_color_to_luma_rounds_to_nearest() {
        // 0.587 * 255 = 149.685 -> 150
        assert_eq!(luma_601(0, 255, 0), 150);
        // 0.886 * 10 = 8.86 -> 9
        assert_eq!(luma_601(10, 10, 0), 9);
        assert_eq!(luma_601(255, 255, 255), 255);
        assert_eq!(luma_601(0, 0, 0), 0);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = Raster::decode(&[0xFF, 0xD8, 0x00, 0x01], ColorMode::Rgb).unwrap_err();
        assert!(err.to_string().starts_with("failed to decode tile"));
    }

    #[test]
    fn test_intensity_clamps_out_of_bounds_pixel() {
        let mut img = GrayImage::new(4, 4);
        img.put_pixel(3, 3, image::Luma([99]));
        let raster = Raster::Luma(img);
        assert_eq!(raster.intensity(PixelOffset::new(255, 255)), 99);
    }

    #[test]
    fn test_mean_rgb_clips_box_to_raster() {
        let mut img = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        img.put_pixel(3, 3, Rgb([40, 80, 120]));
        let raster = Raster::Rgb(img);

        // Only the 2x2 corner [2,4)x[2,4) is inside the raster
        let mean = raster.mean_rgb(2, 2, 10, 10);
        assert_eq!(mean, [10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_mean_rgb_empty_box() {
        let raster = Raster::Rgb(RgbImage::from_pixel(4, 4, Rgb([9, 9, 9])));
        assert_eq!(raster.mean_rgb(5, 0, 8, 4), [0.0; 3]);
    }
}
