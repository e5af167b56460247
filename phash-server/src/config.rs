//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.
//! The resulting [`Config`] is built once at startup and shared read-only.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use phash_core::{
    HasherConfig, PhashError, DEFAULT_HASH_SIZE, DEFAULT_HIGHFREQ_FACTOR,
    DEFAULT_SIMILARITY_THRESHOLD,
};

/// File extensions accepted by the upload endpoint.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Default maximum upload / download size in bytes (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Extra request-body allowance for multipart framing on top of the upload limit.
const MULTIPART_SLACK_BYTES: usize = 64 * 1024;

/// How a remote fetch holds the response body while it downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchSpool {
    /// Buffer the whole body in memory.
    #[default]
    Memory,
    /// Stream the body into a temporary file that is removed when the fetch ends.
    TempFile,
}

impl FetchSpool {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "memory" | "mem" => Some(Self::Memory),
            "tempfile" | "file" | "disk" => Some(Self::TempFile),
            _ => None,
        }
    }
}

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 5000)
    pub port: u16,
    /// Server host (default: 0.0.0.0)
    pub host: [u8; 4],
    /// Allowed CORS origins, comma-separated (default: allow all)
    pub allowed_origins: Option<Vec<String>>,
    /// Maximum accepted image size in bytes, for uploads and downloads (default: 10 MiB)
    pub max_upload_bytes: usize,
    /// Lowercase file extensions accepted for uploads
    pub allowed_extensions: Vec<String>,
    /// Edge length of the retained DCT block; hashes have `hash_size²` bits (default: 8)
    pub hash_size: usize,
    /// DCT grid oversampling factor (default: 4)
    pub highfreq_factor: usize,
    /// Maximum Hamming distance considered similar (default: 5)
    pub similarity_threshold: u32,
    /// Per-fetch timeout for remote images in seconds (default: 15)
    pub fetch_timeout_secs: u64,
    /// Body buffering strategy for remote fetches (default: memory)
    pub fetch_spool: FetchSpool,
    /// Directory for temp-file spooling (default: the system temp dir)
    pub spool_dir: Option<PathBuf>,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            host: [0, 0, 0, 0],
            allowed_origins: None, // None = allow all
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            hash_size: DEFAULT_HASH_SIZE,
            highfreq_factor: DEFAULT_HIGHFREQ_FACTOR,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            fetch_timeout_secs: 15,
            fetch_spool: FetchSpool::Memory,
            spool_dir: None,
            timeout_secs: 30,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env_parse("PORT").unwrap_or(defaults.port);

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "127.0.0.1" || h == "localhost" {
                    [127, 0, 0, 1]
                } else {
                    [0, 0, 0, 0]
                }
            })
            .unwrap_or(defaults.host);

        let allowed_origins = env_list("ALLOWED_ORIGINS");

        let max_upload_bytes = env_parse::<usize>("MAX_UPLOAD_MB")
            .and_then(|mb| {
                let bytes = megabytes(mb);
                if bytes.is_none() {
                    tracing::warn!(mb, "MAX_UPLOAD_MB overflows, using default");
                }
                bytes
            })
            .unwrap_or(defaults.max_upload_bytes);

        let allowed_extensions = env_list("ALLOWED_EXTENSIONS")
            .map(|exts| {
                exts.into_iter()
                    .map(|e| e.trim_start_matches('.').to_lowercase())
                    .collect()
            })
            .unwrap_or(defaults.allowed_extensions);

        let hash_size = env_parse("HASH_SIZE").unwrap_or(defaults.hash_size);
        let highfreq_factor = env_parse("HIGHFREQ_FACTOR").unwrap_or(defaults.highfreq_factor);
        let similarity_threshold =
            env_parse("SIMILARITY_THRESHOLD").unwrap_or(defaults.similarity_threshold);
        let fetch_timeout_secs =
            env_parse("FETCH_TIMEOUT_SECS").unwrap_or(defaults.fetch_timeout_secs);

        let fetch_spool = std::env::var("FETCH_SPOOL")
            .ok()
            .and_then(|v| {
                let parsed = FetchSpool::parse(&v);
                if parsed.is_none() {
                    tracing::warn!(value = %v, "Unknown FETCH_SPOOL, using memory");
                }
                parsed
            })
            .unwrap_or(defaults.fetch_spool);
        let spool_dir = std::env::var_os("FETCH_SPOOL_DIR")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let timeout_secs = env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(defaults.timeout_secs);
        let rate_limit_per_sec =
            env_parse("RATE_LIMIT_PER_SEC").unwrap_or(defaults.rate_limit_per_sec);
        let rate_limit_burst = env_parse("RATE_LIMIT_BURST").unwrap_or(defaults.rate_limit_burst);

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            port,
            host,
            allowed_origins,
            max_upload_bytes,
            allowed_extensions,
            hash_size,
            highfreq_factor,
            similarity_threshold,
            fetch_timeout_secs,
            fetch_spool,
            spool_dir,
            timeout_secs,
            rate_limit_enabled,
            rate_limit_per_sec,
            rate_limit_burst,
        }
    }

    /// Check the hashing parameters and limits are usable.
    pub fn validate(&self) -> Result<(), PhashError> {
        self.hasher_config()?;
        if self.max_upload_bytes == 0 {
            return Err(PhashError::InvalidConfig(
                "maximum upload size must be positive".into(),
            ));
        }
        if self.allowed_extensions.is_empty() {
            return Err(PhashError::InvalidConfig(
                "at least one file extension must be allowed".into(),
            ));
        }
        Ok(())
    }

    /// Hasher parameters derived from this configuration.
    pub fn hasher_config(&self) -> Result<HasherConfig, PhashError> {
        HasherConfig::new(self.hash_size, self.highfreq_factor)
    }

    /// Request body ceiling: the upload limit plus room for multipart framing.
    pub fn body_limit_bytes(&self) -> usize {
        self.max_upload_bytes.saturating_add(MULTIPART_SLACK_BYTES)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }
}

fn megabytes(mb: usize) -> Option<usize> {
    mb.checked_mul(1024 * 1024)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_list(key: &str) -> Option<Vec<String>> {
    std::env::var(key).ok().map(|values| {
        values
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.hash_size, 8);
        assert_eq!(config.similarity_threshold, 5);
        assert_eq!(config.fetch_spool, FetchSpool::Memory);
        assert!(!config.rate_limit_enabled);
        assert!(config.allowed_extensions.iter().any(|e| e == "webp"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_hash_size() {
        let config = Config {
            hash_size: 1,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_extensions() {
        let config = Config {
            allowed_extensions: Vec::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_body_limit_exceeds_upload_limit() {
        let config = Config::default();
        assert!(config.body_limit_bytes() > config.max_upload_bytes);
    }

    #[test]
    fn test_megabytes_rejects_overflow() {
        assert_eq!(megabytes(10), Some(10 * 1024 * 1024));
        assert_eq!(megabytes(0), Some(0));
        assert_eq!(megabytes(usize::MAX), None);
        assert_eq!(megabytes(usize::MAX / 1024), None);
    }

    #[test]
    fn test_fetch_spool_parse() {
        assert_eq!(FetchSpool::parse("memory"), Some(FetchSpool::Memory));
        assert_eq!(FetchSpool::parse(" TempFile "), Some(FetchSpool::TempFile));
        assert_eq!(FetchSpool::parse("disk"), Some(FetchSpool::TempFile));
        assert_eq!(FetchSpool::parse("cloud"), None);
    }

    #[test]
    fn test_socket_addr() {
        let config = Config {
            host: [127, 0, 0, 1],
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8080");
    }
}
