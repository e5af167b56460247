//! Remote image hashing handler
//!
//! Handles POST /process-image/ requests to hash an image by URL.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;

/// Request to hash a remote image
#[derive(Deserialize, ToSchema)]
pub struct ProcessImageRequest {
    /// HTTP or HTTPS URL of the image
    #[schema(example = "https://example.com/cat.jpg")]
    pub url: String,
}

/// Perceptual hash of a single image
#[derive(Serialize, ToSchema)]
pub struct PhashResponse {
    /// Perceptual hash as lowercase hexadecimal
    #[schema(example = "c3e1b07838f8e0c1")]
    pub phash: String,
}

/// Download an image and compute its perceptual hash
///
/// One GET is made to `url` with the configured timeout; there are no retries.
#[utoipa::path(
    post,
    path = "/process-image/",
    tag = "Hashing",
    request_body = ProcessImageRequest,
    responses(
        (status = 200, description = "Hash computed", body = PhashResponse),
        (status = 400, description = "Malformed request or download failure"),
        (status = 500, description = "Image could not be decoded")
    )
)]
pub async fn process_image_handler(
    State(state): State<AppState>,
    payload: Result<Json<ProcessImageRequest>, JsonRejection>,
) -> Result<Json<PhashResponse>, ApiError> {
    let Json(request) = payload?;

    let hash = state.pipeline.hash_url(&request.url).await?;
    info!(url = %request.url, phash = %hash, "Remote image hashed");

    Ok(Json(PhashResponse {
        phash: hash.to_hex(),
    }))
}
