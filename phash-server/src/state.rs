//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use crate::config::Config;
use crate::error::ApiError;
use crate::pipeline::Pipeline;

/// Application state containing shared resources.
///
/// Everything here is read-only after startup; cloning is cheap.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Configuration the server was started with
    pub config: Arc<Config>,
    /// Hasher, comparator and HTTP client shared by all requests
    pub pipeline: Pipeline,
}

impl AppState {
    /// Build the state for `config`, failing if the hashing parameters are invalid.
    pub fn new(config: Config) -> Result<Self, ApiError> {
        config.validate()?;
        let pipeline = Pipeline::from_config(&config)?;
        Ok(Self {
            config: Arc::new(config),
            pipeline,
        })
    }
}
