//! Upload hashing handler
//!
//! Handles POST /phash requests carrying an image as multipart/form-data.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header::CONTENT_LENGTH, HeaderMap},
    Json,
};
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::acquire::{read_upload, UploadPolicy};
use crate::error::ApiError;
use crate::pipeline::{failed_at, Stage};
use crate::state::AppState;

/// Response for a hashed upload
#[derive(Serialize, ToSchema)]
pub struct UploadPhashResponse {
    /// Perceptual hash as lowercase hexadecimal
    #[schema(example = "c3e1b07838f8e0c1")]
    pub phash: String,
    /// Number of bits in the hash
    #[schema(example = 64)]
    pub hash_bits: usize,
}

/// Compute the perceptual hash of an uploaded image
///
/// Accepts multipart/form-data with:
/// - **image** (required): the image file; the file name must carry one of
///   the allowed extensions
///
/// Size, name and extension are checked before the image is decoded.
#[utoipa::path(
    post,
    path = "/phash",
    tag = "Hashing",
    request_body(
        content_type = "multipart/form-data",
        description = "Image file in the `image` field"
    ),
    responses(
        (status = 200, description = "Hash computed", body = UploadPhashResponse),
        (status = 400, description = "Missing, empty, disallowed or oversized file"),
        (status = 500, description = "Image could not be decoded")
    )
)]
pub async fn phash_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadPhashResponse>, ApiError> {
    debug!(stage = %Stage::Received, "Upload request");

    let mut multipart = multipart.map_err(|rejection| {
        debug!(error = %rejection, "Request is not multipart");
        failed_at(Stage::Received, ApiError::validation("No image file provided"))
    })?;

    let declared_len = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let policy = UploadPolicy {
        max_bytes: state.config.max_upload_bytes,
        max_request_bytes: state.config.body_limit_bytes(),
        allowed_extensions: &state.config.allowed_extensions,
    };
    let buffer = read_upload(&mut multipart, declared_len, &policy)
        .await
        .map_err(|e| failed_at(Stage::Received, e))?;
    debug!(stage = %Stage::Validated, source = %buffer.source(), "Upload validated");

    let hash = state.pipeline.hash_upload(buffer).await?;

    info!(phash = %hash, "Upload hashed");
    debug!(stage = %Stage::Responded, "Upload request complete");

    Ok(Json(UploadPhashResponse {
        hash_bits: hash.bit_len(),
        phash: hash.to_hex(),
    }))
}
