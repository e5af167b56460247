//! Image acquisition
//!
//! Obtains raw image bytes either from a multipart upload or from a remote URL.
//! Both paths end in a validated [`ImageBuffer`] or a typed [`ApiError`]; nothing
//! is handed to the decoder until size and type checks have passed.

pub mod remote;
pub mod upload;

pub use remote::RemoteFetcher;
pub use upload::{read_upload, UploadPolicy};

use std::fmt;

/// Where an image came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Multipart upload with the client-supplied file name
    Upload { file_name: String },
    /// HTTP(S) download
    Remote { url: String },
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload { file_name } => write!(f, "upload:{file_name}"),
            Self::Remote { url } => f.write_str(url),
        }
    }
}

/// Raw image bytes that passed acquisition checks.
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    bytes: Vec<u8>,
    declared_len: Option<u64>,
    content_type: Option<String>,
    source: ImageSource,
}

impl ImageBuffer {
    pub(crate) fn new(
        bytes: Vec<u8>,
        declared_len: Option<u64>,
        content_type: Option<String>,
        source: ImageSource,
    ) -> Self {
        Self {
            bytes,
            declared_len,
            content_type,
            source,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Size announced by the sender before the body was read, if any.
    pub fn declared_len(&self) -> Option<u64> {
        self.declared_len
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn source(&self) -> &ImageSource {
        &self.source
    }
}
