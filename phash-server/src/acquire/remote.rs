//! Remote image acquisition over HTTP(S).
//!
//! A single GET per image, no retries. Any transport failure, timeout or
//! non-success status is reported as a download error.
//!
//! ## Spooling
//!
//! - [`FetchSpool::Memory`] collects the body chunks in a `Vec`.
//! - [`FetchSpool::TempFile`] streams them into a [`NamedTempFile`] and reads
//!   the file back once complete. The temp file handle is the only owner of the
//!   file on disk, so it is removed on every exit path, including a failed or
//!   oversized partial write. The file lands in the configured spool directory,
//!   or the system temp dir when none is set.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use reqwest::{header::CONTENT_TYPE, Client, Response};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use super::{ImageBuffer, ImageSource};
use crate::config::{Config, FetchSpool};
use crate::error::ApiError;
use crate::validation::{validate_declared_size, validate_file_size, validate_image_url};

/// User agent sent with every fetch.
const USER_AGENT: &str = concat!("phash-server/", env!("CARGO_PKG_VERSION"));

/// HTTP client for downloading images.
#[derive(Debug, Clone)]
pub struct RemoteFetcher {
    client: Client,
    timeout: Duration,
    max_bytes: usize,
    spool: FetchSpool,
    spool_dir: Option<PathBuf>,
}

impl RemoteFetcher {
    /// Create a fetcher with the given per-fetch timeout, size limit and spool strategy.
    pub fn new(timeout: Duration, max_bytes: usize, spool: FetchSpool) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ApiError::unexpected(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout,
            max_bytes,
            spool,
            spool_dir: None,
        })
    }

    /// Spool temp files into `dir` instead of the system temp dir.
    pub fn with_spool_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.spool_dir = dir;
        self
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Ok(Self::new(
            config.fetch_timeout(),
            config.max_upload_bytes,
            config.fetch_spool,
        )?
        .with_spool_dir(config.spool_dir.clone()))
    }

    pub fn spool(&self) -> FetchSpool {
        self.spool
    }

    /// Download an image and return its validated bytes.
    #[instrument(skip(self), fields(spool = ?self.spool))]
    pub async fn fetch(&self, raw_url: &str) -> Result<ImageBuffer, ApiError> {
        let url = validate_image_url(raw_url)?;
        let start = Instant::now();

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        if !status.is_success() {
            warn!(status = %status, "Non-success HTTP status");
            return Err(ApiError::download(format!(
                "Failed to download image: server returned {status}"
            )));
        }

        let declared_len = response.content_length();
        validate_declared_size(declared_len, self.max_bytes).map_err(as_download)?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = match self.spool {
            FetchSpool::Memory => self.read_to_memory(&mut response).await?,
            FetchSpool::TempFile => self.read_via_tempfile(&mut response).await?,
        };

        if bytes.is_empty() {
            return Err(ApiError::download("Downloaded image is empty"));
        }

        debug!(
            bytes = bytes.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Download completed"
        );

        Ok(ImageBuffer::new(
            bytes,
            declared_len,
            content_type,
            ImageSource::Remote {
                url: url.to_string(),
            },
        ))
    }

    async fn read_to_memory(&self, response: &mut Response) -> Result<Vec<u8>, ApiError> {
        let mut data = Vec::new();
        while let Some(chunk) = self.next_chunk(response).await? {
            validate_file_size(data.len() + chunk.len(), self.max_bytes).map_err(as_download)?;
            data.extend_from_slice(&chunk);
        }
        Ok(data)
    }

    async fn read_via_tempfile(&self, response: &mut Response) -> Result<Vec<u8>, ApiError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("phash-fetch-");
        let spool = match &self.spool_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| ApiError::unexpected(format!("Failed to create spool file: {e}")))?;
        debug!(path = %spool.path().display(), "Spooling download to temp file");

        self.write_spool(&spool, response).await?;

        tokio::fs::read(spool.path())
            .await
            .map_err(|e| ApiError::unexpected(format!("Failed to read spool file: {e}")))
    }

    async fn write_spool(
        &self,
        spool: &NamedTempFile,
        response: &mut Response,
    ) -> Result<(), ApiError> {
        let handle = spool
            .as_file()
            .try_clone()
            .map_err(|e| ApiError::unexpected(format!("Failed to open spool file: {e}")))?;
        let mut file = tokio::fs::File::from_std(handle);

        let mut written = 0usize;
        while let Some(chunk) = self.next_chunk(response).await? {
            written += chunk.len();
            validate_file_size(written, self.max_bytes).map_err(as_download)?;
            file.write_all(&chunk)
                .await
                .map_err(|e| ApiError::unexpected(format!("Failed to write spool file: {e}")))?;
        }

        file.flush()
            .await
            .map_err(|e| ApiError::unexpected(format!("Failed to flush spool file: {e}")))
    }

    async fn next_chunk(&self, response: &mut Response) -> Result<Option<Bytes>, ApiError> {
        response
            .chunk()
            .await
            .map_err(|e| self.transport_error(&e))
    }

    fn transport_error(&self, error: &reqwest::Error) -> ApiError {
        warn!(error = %error, "Image download failed");
        if error.is_timeout() {
            ApiError::download(format!(
                "Timed out downloading image after {}s",
                self.timeout.as_secs()
            ))
        } else {
            ApiError::download(format!("Failed to download image: {error}"))
        }
    }
}

/// Size-limit failures on a remote body are reported as download errors.
fn as_download(err: ApiError) -> ApiError {
    match err {
        ApiError::Validation(msg) => ApiError::Download(msg),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn fetcher(spool: FetchSpool) -> RemoteFetcher {
        RemoteFetcher::new(Duration::from_secs(2), 1024, spool).unwrap()
    }

    /// Serve `body_len` bytes once with no Content-Length, closing the
    /// connection to end the body.
    async fn spawn_unsized_server(body_len: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let head = "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nConnection: close\r\n\r\n";
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&vec![0x89u8; body_len]).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/unsized.png")
    }

    fn is_too_large(err: &ApiError) -> bool {
        matches!(err, ApiError::Download(msg) if msg.starts_with("File too large"))
    }

    #[tokio::test]
    async fn test_unsized_oversized_body_in_memory() {
        let url = spawn_unsized_server(8 * 1024).await;
        let err = fetcher(FetchSpool::Memory).fetch(&url).await.unwrap_err();
        assert!(is_too_large(&err), "got {err:?}");
    }

    #[tokio::test]
    async fn test_unsized_oversized_body_removes_spool_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = spawn_unsized_server(8 * 1024).await;

        let err = fetcher(FetchSpool::TempFile)
            .with_spool_dir(Some(dir.path().to_path_buf()))
            .fetch(&url)
            .await
            .unwrap_err();
        assert!(is_too_large(&err), "got {err:?}");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unsized_body_within_limit_spools_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let url = spawn_unsized_server(512).await;

        let buffer = fetcher(FetchSpool::TempFile)
            .with_spool_dir(Some(dir.path().to_path_buf()))
            .fetch(&url)
            .await
            .unwrap();
        assert_eq!(buffer.bytes().len(), 512);
        assert_eq!(buffer.declared_len(), None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_rejects_invalid_url_without_network() {
        let err = fetcher(FetchSpool::Memory).fetch("not a url").await.unwrap_err();
        assert!(matches!(err, ApiError::Download(_)));
    }

    #[tokio::test]
    async fn test_rejects_unsupported_scheme() {
        let err = fetcher(FetchSpool::TempFile)
            .fetch("file:///etc/hostname")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Download(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_download_error() {
        // Bind then drop a listener to get a port with nothing behind it.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = fetcher(FetchSpool::Memory)
            .fetch(&format!("http://{addr}/image.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Download(_)));
    }

    #[test]
    fn test_size_limit_is_download_error() {
        let err = validate_file_size(2048, 1024).map_err(as_download).unwrap_err();
        assert!(matches!(err, ApiError::Download(ref msg) if msg.starts_with("File too large")));
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            fetch_spool: FetchSpool::TempFile,
            spool_dir: Some(std::env::temp_dir()),
            ..Config::default()
        };
        let fetcher = RemoteFetcher::from_config(&config).unwrap();
        assert_eq!(fetcher.spool(), FetchSpool::TempFile);
        assert_eq!(fetcher.spool_dir, Some(std::env::temp_dir()));
    }
}
