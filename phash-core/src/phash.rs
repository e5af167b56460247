//! DCT perceptual hashing for images.
//!
//! # Algorithm
//!
//! 1. Decode, convert to luminance, resample to N×N where
//!    N = `hash_size * highfreq_factor` (32×32 by default).
//! 2. Apply a 2-D DCT-II to the full grid.
//! 3. Keep the top-left `hash_size`×`hash_size` block of low-frequency coefficients.
//! 4. Take the median of that block, excluding the DC coefficient at (0, 0).
//! 5. Emit one bit per retained coefficient in row-major order: 1 if it is above
//!    the median, 0 otherwise.
//!
//! AC coefficients indistinguishable from floating-point noise are treated as
//! zero. When nothing survives (a flat image) the hash carries the image's
//! brightness instead, as a thermometer code: the first
//! `round(mean / 255 * bit_len)` bits are set. Solid black and solid white land
//! at opposite ends of the Hamming range, and neighbouring gray levels stay
//! within a bit of each other.
//!
//! The output depends only on the pixel grid and the configuration, so the same
//! bytes always produce the same hash.
//!
//! # Usage
//!
//! ```no_run
//! use phash_core::{PerceptualHasher, HasherConfig};
//!
//! let hasher = PerceptualHasher::new(HasherConfig::default());
//! let a = hasher.hash_bytes(&std::fs::read("a.jpg").unwrap()).unwrap();
//! let b = hasher.hash_bytes(&std::fs::read("b.jpg").unwrap()).unwrap();
//! let distance = a.hamming_distance(&b).unwrap();
//! println!("{a} vs {b}: {distance} bits differ");
//! ```

use image::DynamicImage;
use serde::{Serialize, Serializer};
use tracing::trace;

use crate::dct::Dct2d;
use crate::error::{PhashError, Result};
use crate::preprocess::{decode_image, PixelGrid};

/// Default edge length of the retained coefficient block (64-bit hashes).
pub const DEFAULT_HASH_SIZE: usize = 8;

/// Default oversampling factor between the DCT grid and the retained block.
pub const DEFAULT_HIGHFREQ_FACTOR: usize = 4;

/// AC coefficients within this fraction of the DC magnitude are rounding noise.
const NOISE_FLOOR: f32 = 1e-5;

/// Full-scale intensity of a luminance grid.
const MAX_INTENSITY: f32 = 255.0;

/// Hashing parameters. Output bit length is `hash_size²`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HasherConfig {
    hash_size: usize,
    highfreq_factor: usize,
}

impl HasherConfig {
    /// Validate and build a configuration.
    ///
    /// `hash_size` must be at least 2 so that a median exists once the DC
    /// coefficient is excluded.
    pub fn new(hash_size: usize, highfreq_factor: usize) -> Result<Self> {
        if hash_size < 2 {
            return Err(PhashError::InvalidConfig(format!(
                "hash_size must be at least 2, got {hash_size}"
            )));
        }
        if highfreq_factor < 1 {
            return Err(PhashError::InvalidConfig(
                "highfreq_factor must be at least 1".into(),
            ));
        }
        hash_size
            .checked_mul(highfreq_factor)
            .filter(|side| u32::try_from(*side).is_ok())
            .ok_or_else(|| PhashError::InvalidConfig("grid size overflows".into()))?;

        Ok(Self {
            hash_size,
            highfreq_factor,
        })
    }

    pub fn hash_size(&self) -> usize {
        self.hash_size
    }

    pub fn highfreq_factor(&self) -> usize {
        self.highfreq_factor
    }

    /// Edge length of the grid fed to the DCT.
    pub fn grid_side(&self) -> usize {
        self.hash_size * self.highfreq_factor
    }

    /// Number of bits in a hash produced with this configuration.
    pub fn bit_len(&self) -> usize {
        self.hash_size * self.hash_size
    }
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            hash_size: DEFAULT_HASH_SIZE,
            highfreq_factor: DEFAULT_HIGHFREQ_FACTOR,
        }
    }
}

/// Fixed-length perceptual hash.
///
/// Bits are stored as a right-aligned big-endian integer: bit 0 (the first
/// coefficient in row-major order) is the most significant, and any padding
/// bits at the front of the first byte are zero. The bit length never changes
/// after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PerceptualHash {
    pub(crate) bytes: Vec<u8>,
    pub(crate) bit_len: usize,
}

impl PerceptualHash {
    /// Pack a bit sequence, first element most significant.
    pub fn from_bits(bits: &[bool]) -> Self {
        let bit_len = bits.len();
        let byte_len = bit_len.div_ceil(8);
        let pad = byte_len * 8 - bit_len;
        let mut bytes = vec![0u8; byte_len];

        for (i, _) in bits.iter().enumerate().filter(|(_, &set)| set) {
            let pos = pad + i;
            bytes[pos / 8] |= 0x80 >> (pos % 8);
        }

        Self { bytes, bit_len }
    }

    /// Number of bits in the hash.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Packed bytes, leading pad bits zero.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Bit at `index` in production (row-major) order.
    pub fn bit(&self, index: usize) -> Option<bool> {
        if index >= self.bit_len {
            return None;
        }
        let pos = self.pad_bits() + index;
        Some(self.bytes[pos / 8] & (0x80 >> (pos % 8)) != 0)
    }

    /// Iterate over the bits in production order.
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.bit_len).filter_map(move |i| self.bit(i))
    }

    /// Number of bit positions at which the two hashes differ.
    ///
    /// Fails with [`PhashError::InputMismatch`] when the lengths differ; hashes
    /// are never padded or truncated to make them comparable.
    pub fn hamming_distance(&self, other: &Self) -> Result<u32> {
        if self.bit_len != other.bit_len {
            return Err(PhashError::InputMismatch {
                left: self.bit_len,
                right: other.bit_len,
            });
        }

        Ok(self
            .bytes
            .iter()
            .zip(other.bytes.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum())
    }

    pub(crate) fn pad_bits(&self) -> usize {
        self.bytes.len() * 8 - self.bit_len
    }
}

impl Serialize for PerceptualHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Computes perceptual hashes with a fixed configuration.
///
/// The DCT plan is built once and shared, so a hasher can be wrapped in an
/// `Arc` and used from many threads.
#[derive(Debug, Clone)]
pub struct PerceptualHasher {
    config: HasherConfig,
    dct: Dct2d,
}

impl PerceptualHasher {
    pub fn new(config: HasherConfig) -> Self {
        Self {
            dct: Dct2d::new(config.grid_side()),
            config,
        }
    }

    pub fn config(&self) -> HasherConfig {
        self.config
    }

    /// Decode raw image bytes and hash them.
    pub fn hash_bytes(&self, image_data: &[u8]) -> Result<PerceptualHash> {
        let image = decode_image(image_data)?;
        self.hash_image(&image)
    }

    /// Hash an already decoded image.
    pub fn hash_image(&self, image: &DynamicImage) -> Result<PerceptualHash> {
        let grid = PixelGrid::from_image(image, self.config.grid_side())?;
        self.hash_grid(&grid)
    }

    /// Hash a preprocessed grid. The grid side must match the configuration.
    pub fn hash_grid(&self, grid: &PixelGrid) -> Result<PerceptualHash> {
        let side = self.config.grid_side();
        if grid.side() != side {
            return Err(PhashError::InvalidConfig(format!(
                "expected a {side}x{side} grid, got {0}x{0}",
                grid.side()
            )));
        }

        let mut coefficients = grid.values().to_vec();
        self.dct.process(&mut coefficients);

        let hash_size = self.config.hash_size;
        let mut low_freq: Vec<f32> = coefficients
            .chunks_exact(side)
            .take(hash_size)
            .flat_map(|row| row[..hash_size].iter().copied())
            .collect();

        let floor = low_freq[0].abs() * NOISE_FLOOR;
        for c in &mut low_freq[1..] {
            if c.abs() <= floor {
                *c = 0.0;
            }
        }

        // A featureless grid has no structure to threshold; encode its brightness.
        if low_freq[1..].iter().all(|&c| c == 0.0) {
            let mean = grid.values().iter().sum::<f32>() / grid.values().len() as f32;
            return Ok(flat_hash(mean, self.config.bit_len()));
        }

        let median = median(&low_freq[1..]);
        trace!(median, "Low-frequency median");

        let bits: Vec<bool> = low_freq.iter().map(|&c| c > median).collect();
        Ok(PerceptualHash::from_bits(&bits))
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new(HasherConfig::default())
    }
}

/// Thermometer code for a flat grid: the first `round(mean / 255 * bit_len)` bits set.
fn flat_hash(mean: f32, bit_len: usize) -> PerceptualHash {
    let level = (mean / MAX_INTENSITY).clamp(0.0, 1.0);
    let lit = ((level * bit_len as f32).round() as usize).min(bit_len);
    trace!(mean, lit, "Flat grid");

    let bits: Vec<bool> = (0..bit_len).map(|i| i < lit).collect();
    PerceptualHash::from_bits(&bits)
}

/// Median of a non-empty slice; the mean of the two middle values for even lengths.
fn median(values: &[f32]) -> f32 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb};

    fn gradient_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
            let pattern = if (x / 16 + y / 16) % 2 == 0 { 40 } else { 0 };
            Rgb([
                ((x * 255) / width) as u8,
                ((y * 255) / height) as u8,
                pattern,
            ])
        }))
    }

    #[test]
    fn test_config_defaults() {
        let config = HasherConfig::default();
        assert_eq!(config.hash_size(), 8);
        assert_eq!(config.highfreq_factor(), 4);
        assert_eq!(config.grid_side(), 32);
        assert_eq!(config.bit_len(), 64);
    }

    #[test]
    fn test_config_rejects_degenerate_sizes() {
        assert!(HasherConfig::new(1, 4).is_err());
        assert!(HasherConfig::new(0, 4).is_err());
        assert!(HasherConfig::new(8, 0).is_err());
        assert!(HasherConfig::new(16, 4).is_ok());
    }

    #[test]
    fn test_from_bits_layout() {
        let mut bits = vec![false; 64];
        bits[0] = true;
        bits[63] = true;
        let hash = PerceptualHash::from_bits(&bits);
        assert_eq!(hash.as_bytes()[0], 0x80);
        assert_eq!(hash.as_bytes()[7], 0x01);
        assert_eq!(hash.bit(0), Some(true));
        assert_eq!(hash.bit(1), Some(false));
        assert_eq!(hash.bit(64), None);
    }

    #[test]
    fn test_from_bits_pads_at_front() {
        // 9 bits occupy two bytes with 7 leading pad bits.
        let bits = [true; 9];
        let hash = PerceptualHash::from_bits(&bits);
        assert_eq!(hash.as_bytes(), &[0x01, 0xFF]);
        assert_eq!(hash.bits().collect::<Vec<_>>(), bits.to_vec());
    }

    #[test]
    fn test_hamming_distance_identical() {
        let hash = PerceptualHash::from_bits(&[true, false, true, true]);
        assert_eq!(hash.hamming_distance(&hash).unwrap(), 0);
    }

    #[test]
    fn test_hamming_distance_opposite() {
        let a = PerceptualHash::from_bits(&[false; 64]);
        let b = PerceptualHash::from_bits(&[true; 64]);
        assert_eq!(a.hamming_distance(&b).unwrap(), 64);
    }

    #[test]
    fn test_hamming_distance_symmetric() {
        let a = PerceptualHash::from_bits(&[true, false, false, true, true, false, true, false]);
        let b = PerceptualHash::from_bits(&[false, false, true, true, false, false, true, true]);
        assert_eq!(
            a.hamming_distance(&b).unwrap(),
            b.hamming_distance(&a).unwrap()
        );
        assert_eq!(a.hamming_distance(&b).unwrap(), 4);
    }

    #[test]
    fn test_hamming_distance_length_mismatch() {
        let a = PerceptualHash::from_bits(&[false; 64]);
        let b = PerceptualHash::from_bits(&[false; 256]);
        let err = a.hamming_distance(&b).unwrap_err();
        assert!(matches!(
            err,
            PhashError::InputMismatch {
                left: 64,
                right: 256
            }
        ));
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_hash_has_configured_length() {
        let image = gradient_image(128, 96);
        let hash = PerceptualHasher::default().hash_image(&image).unwrap();
        assert_eq!(hash.bit_len(), 64);

        let hasher = PerceptualHasher::new(HasherConfig::new(16, 4).unwrap());
        assert_eq!(hasher.hash_image(&image).unwrap().bit_len(), 256);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let image = gradient_image(200, 150);
        let hasher = PerceptualHasher::default();
        let a = hasher.hash_image(&image).unwrap();
        let b = hasher.hash_image(&image).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_grid_rejects_wrong_side() {
        let grid = PixelGrid::from_values(4, vec![0.0; 16]).unwrap();
        assert!(matches!(
            PerceptualHasher::default().hash_grid(&grid),
            Err(PhashError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_hash_grid_vertical_edge() {
        // Left half dark, right half bright: first horizontal frequency dominates
        // and is negative, so bit (0, 1) must be clear while DC is set.
        let side = 32;
        let values = (0..side * side)
            .map(|i| if i % side < side / 2 { 0.0 } else { 255.0 })
            .collect();
        let grid = PixelGrid::from_values(side, values).unwrap();
        let hash = PerceptualHasher::default().hash_grid(&grid).unwrap();

        assert_eq!(hash.bit(0), Some(true));
        assert_eq!(hash.bit(1), Some(false));
    }

    #[test]
    fn test_solid_images_are_far_apart() {
        let hasher = PerceptualHasher::default();
        let black = DynamicImage::ImageLuma8(ImageBuffer::from_pixel(64, 64, Luma([0u8])));
        let white = DynamicImage::ImageLuma8(ImageBuffer::from_pixel(64, 64, Luma([255u8])));

        let hb = hasher.hash_image(&black).unwrap();
        let hw = hasher.hash_image(&white).unwrap();
        assert!(hb.bits().all(|b| !b));
        assert!(hw.bits().all(|b| b));
        assert_eq!(hb.hamming_distance(&hw).unwrap(), 64);
    }

    #[test]
    fn test_flat_grids_are_stable() {
        let hasher = PerceptualHasher::default();
        let a = hasher
            .hash_grid(&PixelGrid::from_values(32, vec![200.0; 1024]).unwrap())
            .unwrap();
        let b = hasher
            .hash_grid(&PixelGrid::from_values(32, vec![201.0; 1024]).unwrap())
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_flat_neighbouring_grays_stay_close() {
        let hasher = PerceptualHasher::default();
        let dark = DynamicImage::ImageLuma8(ImageBuffer::from_pixel(64, 64, Luma([127u8])));
        let light = DynamicImage::ImageLuma8(ImageBuffer::from_pixel(64, 64, Luma([128u8])));

        let hd = hasher.hash_image(&dark).unwrap();
        let hl = hasher.hash_image(&light).unwrap();
        assert!(hd.hamming_distance(&hl).unwrap() <= 1);
        assert!(
            crate::compare::SimilarityComparator::default()
                .compare(&hd, &hl)
                .unwrap()
                .is_similar
        );
    }

    #[test]
    fn test_flat_hash_is_thermometer_code() {
        assert_eq!(flat_hash(0.0, 64).to_hex(), "0000000000000000");
        assert_eq!(flat_hash(255.0, 64).to_hex(), "ffffffffffffffff");
        // Half brightness lights the leading half of the bits.
        assert_eq!(flat_hash(127.5, 64).to_hex(), "ffffffff00000000");
        assert_eq!(flat_hash(300.0, 64).bits().filter(|&b| b).count(), 64);
    }
}
