//! Request pipeline
//!
//! Composes acquisition, decoding, hashing and comparison for each endpoint.
//! Every request walks the same stages:
//!
//! ```text
//! RECEIVED → VALIDATED → ACQUIRED → DECODED → HASHED → (COMPARED) → RESPONDED
//! ```
//!
//! and fails out of whichever stage it is in. Requests share nothing but the
//! immutable hasher, comparator and HTTP client held here.

use std::fmt;
use std::sync::Arc;

use phash_core::{
    preprocess, ComparisonResult, PerceptualHash, PerceptualHasher, SimilarityComparator,
};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, Instrument, Span};

use crate::acquire::{ImageBuffer, RemoteFetcher};
use crate::config::Config;
use crate::error::ApiError;

/// Lifecycle stage of a single request, used in structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    Acquired,
    Decoded,
    Hashed,
    Compared,
    Responded,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Acquired => "acquired",
            Self::Decoded => "decoded",
            Self::Hashed => "hashed",
            Self::Compared => "compared",
            Self::Responded => "responded",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record that a request left `stage` with an error, then hand the error back.
pub(crate) fn failed_at(stage: Stage, err: ApiError) -> ApiError {
    debug!(stage = %stage, error = %err, "Pipeline failed");
    err
}

/// Shared, immutable pipeline components.
#[derive(Debug, Clone)]
pub struct Pipeline {
    hasher: Arc<PerceptualHasher>,
    comparator: SimilarityComparator,
    fetcher: Arc<RemoteFetcher>,
}

impl Pipeline {
    pub fn new(
        hasher: PerceptualHasher,
        comparator: SimilarityComparator,
        fetcher: RemoteFetcher,
    ) -> Self {
        Self {
            hasher: Arc::new(hasher),
            comparator,
            fetcher: Arc::new(fetcher),
        }
    }

    /// Build the pipeline described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let hasher = PerceptualHasher::new(config.hasher_config()?);
        let comparator = SimilarityComparator::new(config.similarity_threshold);
        let fetcher = RemoteFetcher::from_config(config)?;
        Ok(Self::new(hasher, comparator, fetcher))
    }

    /// Decode and hash an acquired buffer on the blocking pool.
    #[instrument(skip_all, fields(source = %buffer.source(), bytes = buffer.len()))]
    pub async fn hash_buffer(&self, buffer: ImageBuffer) -> Result<PerceptualHash, ApiError> {
        let hasher = Arc::clone(&self.hasher);
        let span = Span::current();

        let result = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            let grid = preprocess(buffer.bytes(), hasher.config().grid_side())
                .map_err(|e| failed_at(Stage::Acquired, e.into()))?;
            debug!(stage = %Stage::Decoded, side = grid.side(), "Image decoded");

            let hash = hasher
                .hash_grid(&grid)
                .map_err(|e| failed_at(Stage::Decoded, e.into()))?;
            debug!(stage = %Stage::Hashed, phash = %hash, "Image hashed");
            Ok::<_, ApiError>(hash)
        })
        .await?;

        result
    }

    /// Hash an uploaded image.
    pub async fn hash_upload(&self, buffer: ImageBuffer) -> Result<PerceptualHash, ApiError> {
        debug!(
            stage = %Stage::Acquired,
            bytes = buffer.len(),
            declared_len = ?buffer.declared_len(),
            content_type = ?buffer.content_type(),
            "Upload acquired"
        );
        self.hash_buffer(buffer).await
    }

    /// Fetch an image by URL and hash it.
    #[instrument(skip(self))]
    pub async fn hash_url(&self, url: &str) -> Result<PerceptualHash, ApiError> {
        debug!(stage = %Stage::Received, "Fetching image");
        let buffer = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|e| failed_at(Stage::Received, e))?;
        debug!(
            stage = %Stage::Acquired,
            bytes = buffer.len(),
            declared_len = ?buffer.declared_len(),
            content_type = ?buffer.content_type(),
            "Image acquired"
        );

        self.hash_buffer(buffer).await
    }

    /// Hash two URLs concurrently and compare the results.
    ///
    /// Both pipelines run as independent tasks. The first error is returned
    /// immediately; the other task is left to finish on its own, releasing its
    /// buffers when it completes.
    #[instrument(skip(self))]
    pub async fn compare_urls(
        &self,
        url_a: &str,
        url_b: &str,
    ) -> Result<ComparisonResult, ApiError> {
        let first = self.spawn_hash_url(url_a);
        let second = self.spawn_hash_url(url_b);

        let (hash_a, hash_b) = tokio::try_join!(join_task(first), join_task(second))?;

        self.compare(&hash_a, &hash_b)
    }

    /// Hash a URL and compare it with a caller-supplied hex hash.
    ///
    /// The target is parsed before any download, and must have exactly the bit
    /// length this server produces.
    #[instrument(skip(self))]
    pub async fn compare_with_target(
        &self,
        url: &str,
        target_hex: &str,
    ) -> Result<ComparisonResult, ApiError> {
        let bit_len = self.hasher.config().bit_len();
        let target = PerceptualHash::from_hex_with_bits(target_hex.trim(), bit_len)
            .map_err(|e| failed_at(Stage::Received, e.into()))?;
        debug!(stage = %Stage::Validated, target = %target, "Target hash parsed");

        let computed = self.hash_url(url).await?;
        self.compare(&computed, &target)
    }

    fn compare(&self, a: &PerceptualHash, b: &PerceptualHash) -> Result<ComparisonResult, ApiError> {
        let result = self
            .comparator
            .compare(a, b)
            .map_err(|e| failed_at(Stage::Hashed, e.into()))?;
        debug!(
            stage = %Stage::Compared,
            distance = result.hamming_distance,
            similar = result.is_similar,
            "Hashes compared"
        );
        Ok(result)
    }

    fn spawn_hash_url(&self, url: &str) -> JoinHandle<Result<PerceptualHash, ApiError>> {
        let pipeline = self.clone();
        let url = url.to_owned();
        tokio::spawn(async move { pipeline.hash_url(&url).await }.instrument(Span::current()))
    }
}

async fn join_task<T>(handle: JoinHandle<Result<T, ApiError>>) -> Result<T, ApiError> {
    handle.await?
}
