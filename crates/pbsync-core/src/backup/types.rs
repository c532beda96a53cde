//! Backup operation types.

use std::fmt;

use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::FileToken;
use crate::Result;

/// Health report of an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    /// Status code reported inside the payload.
    pub code: u16,

    /// Human readable status message.
    pub message: String,

    /// Whether the instance is able to create backups right now.
    pub can_backup: bool,
}

impl HealthStatus {
    /// Whether the payload reports a healthy instance.
    pub fn is_ok(&self) -> bool {
        self.code == 200
    }
}

/// Everything needed to fetch one backup artifact.
///
/// Built from a freshly issued file token; never reused across downloads.
#[derive(Clone)]
pub struct DownloadDescriptor {
    /// File access token embedded in the URL.
    pub token: FileToken,

    /// Fully composed download URL.
    pub url: String,
}

impl fmt::Debug for DownloadDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let url = self.url.split('?').next().unwrap_or_default();
        f.debug_struct("DownloadDescriptor")
            .field("token", &self.token)
            .field("url", &url)
            .finish()
    }
}

/// Stream of artifact chunks in the order they were received.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// An opened remote artifact.
pub struct ByteSource {
    /// Length announced by the transport, if any.
    pub content_length: Option<u64>,

    /// The body chunks.
    pub stream: ByteStream,
}

impl ByteSource {
    /// Wrap a stream with an optional announced length.
    pub fn new(content_length: Option<u64>, stream: ByteStream) -> Self {
        Self {
            content_length,
            stream,
        }
    }
}

impl fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteSource")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}
