//! pHash Server Library - REST API for perceptual image hashing and comparison
//!
//! This library exposes the server components for use in integration tests.
//! The main binary uses these same components.

pub mod acquire;
pub mod config;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod validation;

pub use acquire::{ImageBuffer, ImageSource, RemoteFetcher};
pub use config::{Config, FetchSpool};
pub use error::ApiError;
pub use openapi::ApiDoc;
pub use pipeline::{Pipeline, Stage};
pub use routes::{create_router, create_router_with_config, create_router_with_state};
pub use state::AppState;
