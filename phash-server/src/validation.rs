//! Input validation module
//!
//! Checks uploads and image URLs before any bytes reach the decoder.

use url::Url;

use crate::error::ApiError;

/// Validates that an uploaded file has a name
pub fn validate_file_name(file_name: Option<&str>) -> Result<&str, ApiError> {
    match file_name.map(str::trim) {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(ApiError::validation("No selected file")),
    }
}

/// Validates the extension of an uploaded file name against the allowed set
///
/// Comparison is case-insensitive; a name without an extension is rejected.
pub fn validate_extension(file_name: &str, allowed: &[String]) -> Result<(), ApiError> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty());

    match extension {
        Some(ext) if allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext)) => Ok(()),
        _ => Err(ApiError::validation("Invalid file type")),
    }
}

/// Validates a declared size (e.g. a Content-Length header) before reading
pub fn validate_declared_size(declared: Option<u64>, max_size: usize) -> Result<(), ApiError> {
    match declared {
        Some(len) if len > max_size as u64 => Err(too_large(len, max_size)),
        _ => Ok(()),
    }
}

/// Validates the size of an uploaded or downloaded file
///
/// Returns an error if the file exceeds the maximum size.
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ApiError> {
    if size > max_size {
        Err(too_large(size as u64, max_size))
    } else {
        Ok(())
    }
}

/// Validates an image URL: must parse and use http or https
pub fn validate_image_url(raw: &str) -> Result<Url, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::download("No URL provided"));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| ApiError::download(format!("Invalid URL '{}': {}", trimmed, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ApiError::download(format!(
            "Unsupported URL scheme '{}': only http and https are allowed",
            other
        ))),
    }
}

/// Error for a request body cut off by the body limit before its size was known
pub fn body_too_large(max_size: usize) -> ApiError {
    ApiError::validation(format!(
        "File too large: request body exceeds maximum of {:.1} MB",
        max_size as f64 / (1024.0 * 1024.0)
    ))
}

fn too_large(size: u64, max_size: usize) -> ApiError {
    let max_mb = max_size as f64 / (1024.0 * 1024.0);
    let actual_mb = size as f64 / (1024.0 * 1024.0);
    ApiError::validation(format!(
        "File too large: {:.1} MB exceeds maximum of {:.1} MB",
        actual_mb, max_mb
    ))
}
