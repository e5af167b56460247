//! phash-core - Perceptual image hashing and similarity
//!
//! This crate computes DCT-based perceptual hashes ("pHash") for images and
//! decides whether two images are visually similar by the Hamming distance
//! between their hashes.
//!
//! # Features
//!
//! - Decoding of PNG, JPEG, GIF, BMP and WebP into a luminance grid
//! - Configurable hash size (64-bit hashes by default)
//! - Strict hexadecimal codec for exchanging hashes as text
//! - Threshold-based similarity decisions kept separate from the distance metric
//!
//! # Example
//!
//! ```no_run
//! use phash_core::{PerceptualHash, PerceptualHasher, SimilarityComparator};
//!
//! # fn example() -> phash_core::Result<()> {
//! let hasher = PerceptualHasher::default();
//! let computed = hasher.hash_bytes(&std::fs::read("photo.jpg").unwrap())?;
//!
//! let target = PerceptualHash::from_hex_with_bits("c3a1f0e0d0c0b0a0", computed.bit_len())?;
//! let result = SimilarityComparator::default().compare(&computed, &target)?;
//! println!("distance {} similar {}", result.hamming_distance, result.is_similar);
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod compare;
pub mod dct;
pub mod error;
pub mod phash;
pub mod preprocess;

pub use compare::{ComparisonResult, SimilarityComparator, DEFAULT_SIMILARITY_THRESHOLD};
pub use dct::Dct2d;
pub use error::{PhashError, Result};
pub use phash::{
    HasherConfig, PerceptualHash, PerceptualHasher, DEFAULT_HASH_SIZE, DEFAULT_HIGHFREQ_FACTOR,
};
pub use preprocess::{decode_image, preprocess, sniff_format, PixelGrid};

/// Re-export so downstream crates and tests agree on the `image` version.
pub use image;
