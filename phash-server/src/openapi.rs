//! OpenAPI documentation configuration
//!
//! Generates OpenAPI 3.0 specification for the perceptual hash API.

use utoipa::OpenApi;

use crate::handlers::{
    CompareHashRequest, CompareHashResponse, CompareImagesRequest, CompareImagesResponse,
    HealthResponse, PhashResponse, ProcessImageRequest, ReadyResponse, UploadPhashResponse,
};

/// Perceptual Hash API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "pHash Service",
        version = "0.1.0",
        description = r#"
## Perceptual Image Hashing API

Computes DCT-based perceptual hashes of images and compares them by Hamming
distance. Visually similar images (recompressed, rescaled) produce hashes a
few bits apart; unrelated images differ in roughly half of their bits.

### Endpoints

1. **Hash an upload** via `POST /phash` (multipart field `image`)
2. **Hash a remote image** via `POST /process-image/`
3. **Compare two remote images** via `POST /compare-images/`
4. **Compare a remote image with a known hash** via `POST /compare-hash/`

Hashes are lowercase hexadecimal, 16 characters for the default 64-bit hash.
Errors are returned as `{"error": "...", "code": "..."}`.
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    tags(
        (name = "Hashing", description = "Compute perceptual hashes of images"),
        (name = "Comparison", description = "Compare images by Hamming distance between hashes"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::phash::phash_handler,
        crate::handlers::process::process_image_handler,
        crate::handlers::compare::compare_images_handler,
        crate::handlers::compare::compare_hash_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            UploadPhashResponse,
            ProcessImageRequest,
            PhashResponse,
            CompareImagesRequest,
            CompareImagesResponse,
            CompareHashRequest,
            CompareHashResponse,
        )
    )
)]
pub struct ApiDoc;
