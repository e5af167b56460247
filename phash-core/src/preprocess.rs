//! Image decoding and preprocessing.
//!
//! Turns raw image bytes into a [`PixelGrid`]: a square, single-channel
//! intensity matrix sized for the DCT stage.
//!
//! Decoding consumes the input exactly once. The container format is sniffed
//! from the magic bytes of the caller's slice, which is an independent view;
//! the actual decode then gets its own reader positioned at the start of the
//! buffer, so the sniff can never leave a shared reader half-consumed.

use std::io::Cursor;

use image::{imageops::FilterType, DynamicImage, ImageFormat, ImageReader};
use tracing::debug;

use crate::error::{PhashError, Result};

/// Decode raw image bytes into a [`DynamicImage`].
///
/// Supports PNG, JPEG, GIF, BMP and WebP. Corrupt, truncated or unknown
/// data fails with [`PhashError::Decode`].
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(PhashError::Decode("empty image data".into()));
    }

    let format = sniff_format(bytes)?;

    let image = ImageReader::with_format(Cursor::new(bytes), format)
        .decode()
        .map_err(|e| PhashError::Decode(format!("Failed to decode {format:?} image: {e}")))?;

    debug!(
        format = ?format,
        width = image.width(),
        height = image.height(),
        "Decoded image"
    );

    Ok(image)
}

/// Identify the container format from the leading magic bytes.
pub fn sniff_format(bytes: &[u8]) -> Result<ImageFormat> {
    image::guess_format(bytes)
        .map_err(|e| PhashError::Decode(format!("Unrecognized image format: {e}")))
}

/// Square grid of luminance values, produced once per image.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelGrid {
    side: usize,
    values: Vec<f32>,
}

impl PixelGrid {
    /// Convert an image to grayscale and resample it (Lanczos3) to `side`×`side`.
    pub fn from_image(image: &DynamicImage, side: usize) -> Result<Self> {
        if side == 0 {
            return Err(PhashError::InvalidConfig("grid side must be positive".into()));
        }
        let side_px = u32::try_from(side)
            .map_err(|_| PhashError::InvalidConfig(format!("grid side {side} too large")))?;

        let gray = image.to_luma8();
        let resized = image::imageops::resize(&gray, side_px, side_px, FilterType::Lanczos3);

        let values = resized.as_raw().iter().map(|&v| f32::from(v)).collect();
        Ok(Self { side, values })
    }

    /// Build a grid from already-prepared row-major intensity values.
    pub fn from_values(side: usize, values: Vec<f32>) -> Result<Self> {
        if side == 0 || values.len() != side * side {
            return Err(PhashError::InvalidConfig(format!(
                "expected {} values for a {side}x{side} grid, got {}",
                side * side,
                values.len()
            )));
        }
        Ok(Self { side, values })
    }

    /// Width and height of the grid.
    pub fn side(&self) -> usize {
        self.side
    }

    /// Row-major intensity values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Decode `bytes` and reduce them to a `side`×`side` grid.
pub fn preprocess(bytes: &[u8], side: usize) -> Result<PixelGrid> {
    let image = decode_image(bytes)?;
    PixelGrid::from_image(&image, side)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};

    fn encode_png(img: &RgbImage) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let img: RgbImage = ImageBuffer::from_pixel(10, 7, Rgb([10, 20, 30]));
        let decoded = decode_image(&encode_png(&img)).unwrap();
        assert_eq!(decoded.width(), 10);
        assert_eq!(decoded.height(), 7);
    }

    #[test]
    fn test_decode_empty_fails() {
        assert!(matches!(decode_image(&[]), Err(PhashError::Decode(_))));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, PhashError::Decode(_)));
    }

    #[test]
    fn test_decode_truncated_png_fails() {
        let img: RgbImage = ImageBuffer::from_pixel(64, 64, Rgb([200, 10, 10]));
        let bytes = encode_png(&img);
        let truncated = &bytes[..bytes.len() / 2];
        assert!(matches!(decode_image(truncated), Err(PhashError::Decode(_))));
    }

    #[test]
    fn test_grid_dimensions() {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(100, 50, Rgb([0, 0, 0])));
        let grid = PixelGrid::from_image(&img, 32).unwrap();
        assert_eq!(grid.side(), 32);
        assert_eq!(grid.values().len(), 32 * 32);
    }

    #[test]
    fn test_grid_is_grayscale_luminance() {
        let white = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(8, 8, Rgb([255, 255, 255])));
        let grid = PixelGrid::from_image(&white, 4).unwrap();
        assert!(grid.values().iter().all(|&v| v == 255.0));

        let black = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(8, 8, Rgb([0, 0, 0])));
        let grid = PixelGrid::from_image(&black, 4).unwrap();
        assert!(grid.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_from_values_is_row_major() {
        let grid = PixelGrid::from_values(2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(grid.side(), 2);
        assert_eq!(grid.values()[2], 3.0);
    }

    #[test]
    fn test_from_values_rejects_wrong_length() {
        assert!(PixelGrid::from_values(3, vec![0.0; 8]).is_err());
        assert!(PixelGrid::from_values(0, vec![]).is_err());
    }

    #[test]
    fn test_preprocess_from_bytes() {
        let img: RgbImage = ImageBuffer::from_fn(40, 40, |x, _| Rgb([(x * 6) as u8, 0, 0]));
        let grid = preprocess(&encode_png(&img), 16).unwrap();
        assert_eq!(grid.side(), 16);
    }
}
