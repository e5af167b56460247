//! Similarity decisions between perceptual hashes.

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::phash::PerceptualHash;

/// Default maximum Hamming distance for two hashes to count as similar.
///
/// Five bits out of 64 is a conventional starting point, not a derived
/// constant; callers tune it through [`SimilarityComparator::new`].
pub const DEFAULT_SIMILARITY_THRESHOLD: u32 = 5;

/// Outcome of comparing two hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonResult {
    pub hash_a: PerceptualHash,
    pub hash_b: PerceptualHash,
    pub hamming_distance: u32,
    pub is_similar: bool,
}

/// Applies a similarity threshold to Hamming distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimilarityComparator {
    threshold: u32,
}

impl SimilarityComparator {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Compare two hashes of equal bit length.
    ///
    /// Fails with [`crate::PhashError::InputMismatch`] before any distance is
    /// computed if the lengths differ.
    pub fn compare(&self, a: &PerceptualHash, b: &PerceptualHash) -> Result<ComparisonResult> {
        let hamming_distance = a.hamming_distance(b)?;
        let is_similar = self.is_within(hamming_distance);

        debug!(
            distance = hamming_distance,
            threshold = self.threshold,
            similar = is_similar,
            "Compared hashes"
        );

        Ok(ComparisonResult {
            hash_a: a.clone(),
            hash_b: b.clone(),
            hamming_distance,
            is_similar,
        })
    }

    /// Whether a distance falls at or under the threshold.
    pub fn is_within(&self, distance: u32) -> bool {
        distance <= self.threshold
    }
}

impl Default for SimilarityComparator {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}
