//! Multipart upload acquisition
//!
//! Pulls the `image` field out of a multipart/form-data request, enforcing the
//! file name, extension and size rules while the body is streamed in.

use axum::extract::{
    multipart::{Field, MultipartError},
    Multipart,
};
use axum::http::StatusCode;
use tracing::debug;

use super::{ImageBuffer, ImageSource};
use crate::error::ApiError;
use crate::validation::{
    body_too_large, validate_declared_size, validate_extension, validate_file_name,
    validate_file_size,
};

/// Name of the multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";

/// Limits applied to an upload.
#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy<'a> {
    /// Maximum number of image bytes
    pub max_bytes: usize,
    /// Maximum request body, multipart framing included
    pub max_request_bytes: usize,
    /// Lowercase extensions accepted in the file name
    pub allowed_extensions: &'a [String],
}

/// Read and validate the uploaded image
///
/// # Arguments
/// * `multipart` - The Axum multipart extractor
/// * `declared_len` - Request Content-Length, when the client sent one; checked
///   against `max_request_bytes`
/// * `policy` - Size and extension limits
///
/// Checks happen in this order, each failing with a validation error:
/// declared size, presence of the `image` field, non-empty file name,
/// allowed extension, then the actual byte count as chunks arrive.
pub async fn read_upload(
    multipart: &mut Multipart,
    declared_len: Option<u64>,
    policy: &UploadPolicy<'_>,
) -> Result<ImageBuffer, ApiError> {
    validate_declared_size(declared_len, policy.max_request_bytes)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "Failed to parse multipart", policy.max_request_bytes))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = validate_file_name(field.file_name())?.to_string();
        validate_extension(&file_name, policy.allowed_extensions)?;
        let content_type = field.content_type().map(|s| s.to_string());

        let data = read_limited(field, policy).await?;
        if data.is_empty() {
            return Err(ApiError::validation("Uploaded file is empty"));
        }

        debug!(
            file_name = %file_name,
            bytes = data.len(),
            content_type = ?content_type,
            "Upload received"
        );

        return Ok(ImageBuffer::new(
            data,
            declared_len,
            content_type,
            ImageSource::Upload { file_name },
        ));
    }

    Err(ApiError::validation("No image file provided"))
}

/// Read a field chunk by chunk, failing as soon as the limit is crossed.
async fn read_limited(
    mut field: Field<'_>,
    policy: &UploadPolicy<'_>,
) -> Result<Vec<u8>, ApiError> {
    let mut data = Vec::new();

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, "Failed to read file", policy.max_request_bytes))?
    {
        validate_file_size(data.len() + chunk.len(), policy.max_bytes)?;
        data.extend_from_slice(&chunk);
    }

    Ok(data)
}

/// Body-limit hits surface as the usual size error; anything else is malformed input.
fn multipart_error(err: MultipartError, context: &str, max_request_bytes: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        debug!(error = %err, "Request body limit reached");
        body_too_large(max_request_bytes)
    } else {
        ApiError::validation(format!("{}: {}", context, err))
    }
}
