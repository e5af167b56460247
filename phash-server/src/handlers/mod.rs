//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod compare;
pub mod health;
pub mod phash;
pub mod process;

pub use crate::state::AppState;
pub use compare::{
    compare_hash_handler, compare_images_handler, CompareHashRequest, CompareHashResponse,
    CompareImagesRequest, CompareImagesResponse,
};
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use phash::{phash_handler, UploadPhashResponse};
pub use process::{process_image_handler, PhashResponse, ProcessImageRequest};
