//! Comparison handlers
//!
//! Handles POST /compare-images/ (two URLs) and POST /compare-hash/ (one URL
//! against a known hash).

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;

/// Request to compare two remote images
#[derive(Deserialize, ToSchema)]
pub struct CompareImagesRequest {
    /// URL of the first image
    #[schema(example = "https://example.com/original.jpg")]
    pub url_a: String,
    /// URL of the second image
    #[schema(example = "https://example.com/recompressed.jpg")]
    pub url_b: String,
}

/// Result of comparing two remote images
#[derive(Serialize, ToSchema)]
pub struct CompareImagesResponse {
    /// Hash of the first image
    #[schema(example = "c3e1b07838f8e0c1")]
    pub phash_a: String,
    /// Hash of the second image
    #[schema(example = "c3e1b07838f8e0c3")]
    pub phash_b: String,
    /// Number of differing bits
    #[schema(example = 1)]
    pub hamming_distance: u32,
    /// Whether the distance is within the similarity threshold
    #[schema(example = true)]
    pub is_similar: bool,
}

/// Compare two images by URL
///
/// Both images are downloaded and hashed concurrently. The first failure is
/// returned as soon as it happens.
#[utoipa::path(
    post,
    path = "/compare-images/",
    tag = "Comparison",
    request_body = CompareImagesRequest,
    responses(
        (status = 200, description = "Images compared", body = CompareImagesResponse),
        (status = 400, description = "Malformed request or download failure"),
        (status = 500, description = "An image could not be decoded")
    )
)]
pub async fn compare_images_handler(
    State(state): State<AppState>,
    payload: Result<Json<CompareImagesRequest>, JsonRejection>,
) -> Result<Json<CompareImagesResponse>, ApiError> {
    let Json(request) = payload?;

    let result = state
        .pipeline
        .compare_urls(&request.url_a, &request.url_b)
        .await?;

    info!(
        distance = result.hamming_distance,
        similar = result.is_similar,
        "Images compared"
    );

    Ok(Json(CompareImagesResponse {
        phash_a: result.hash_a.to_hex(),
        phash_b: result.hash_b.to_hex(),
        hamming_distance: result.hamming_distance,
        is_similar: result.is_similar,
    }))
}

/// Request to compare a remote image with a known hash
#[derive(Deserialize, ToSchema)]
pub struct CompareHashRequest {
    /// URL of the image
    #[schema(example = "https://example.com/cat.jpg")]
    pub url: String,
    /// Hexadecimal hash to compare against; must match the server's hash length
    #[schema(example = "c3e1b07838f8e0c1")]
    pub phash_target: String,
}

/// Result of comparing a remote image with a known hash
#[derive(Serialize, ToSchema)]
pub struct CompareHashResponse {
    /// Hash computed from the image
    #[schema(example = "c3e1b07838f8e0c1")]
    pub phash_calculated: String,
    /// Target hash, normalized to lowercase
    #[schema(example = "c3e1b07838f8e0c1")]
    pub phash_target: String,
    /// Number of differing bits
    #[schema(example = 0)]
    pub hamming_distance: u32,
    /// Whether the distance is within the similarity threshold
    #[schema(example = true)]
    pub is_similar: bool,
}

/// Compare an image by URL against a hexadecimal hash
///
/// The target hash is validated before anything is downloaded.
#[utoipa::path(
    post,
    path = "/compare-hash/",
    tag = "Comparison",
    request_body = CompareHashRequest,
    responses(
        (status = 200, description = "Image compared with target", body = CompareHashResponse),
        (status = 400, description = "Malformed target hash, malformed request or download failure"),
        (status = 500, description = "Image could not be decoded")
    )
)]
pub async fn compare_hash_handler(
    State(state): State<AppState>,
    payload: Result<Json<CompareHashRequest>, JsonRejection>,
) -> Result<Json<CompareHashResponse>, ApiError> {
    let Json(request) = payload?;

    let result = state
        .pipeline
        .compare_with_target(&request.url, &request.phash_target)
        .await?;

    info!(
        distance = result.hamming_distance,
        similar = result.is_similar,
        "Image compared with target hash"
    );

    Ok(Json(CompareHashResponse {
        phash_calculated: result.hash_a.to_hex(),
        phash_target: result.hash_b.to_hex(),
        hamming_distance: result.hamming_distance,
        is_similar: result.is_similar,
    }))
}
