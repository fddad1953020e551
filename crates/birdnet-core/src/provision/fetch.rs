//! Archive transport
//!
//! [`ArchiveFetcher`] is the seam between the provisioner and the network.
//! [`HttpFetcher`] is the production implementation; tests substitute
//! in-memory fetchers.

use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::{ProvisionError, Result};

/// Size of the buffer the response body is copied through
const CHUNK_SIZE: usize = 8192;

/// An open response whose body has not been read yet
pub struct FetchResponse {
    pub status: u16,
    /// Advertised `Content-Length`, 0 when unknown
    pub content_length: u64,
    pub body: Box<dyn Read + Send>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Opens a streamed GET request for an archive URL
pub trait ArchiveFetcher {
    /// Start the request
    ///
    /// Non-success statuses are returned as responses so the caller can
    /// report them. Only transport failures are errors.
    fn fetch(&self, url: &str) -> Result<FetchResponse>;
}

/// Blocking HTTP fetcher with connect and read timeouts
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .build();
        Self { agent }
    }
}

impl ArchiveFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchResponse> {
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(e) => return Err(ProvisionError::Network(format!("{}: {}", url, e))),
        };

        let content_length = response
            .header("Content-Length")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        Ok(FetchResponse {
            status: response.status(),
            content_length,
            body: response.into_reader(),
        })
    }
}

/// State of one in-flight archive download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTransfer {
    pub url: String,
    pub destination: PathBuf,
    /// Advertised size, 0 when the server did not say
    pub expected_bytes: u64,
    pub received_bytes: u64,
    /// Body ended with an unexpected EOF
    pub truncated: bool,
}

impl DownloadTransfer {
    pub fn new(url: &str, destination: &Path, expected_bytes: u64) -> Self {
        Self {
            url: url.to_string(),
            destination: destination.to_path_buf(),
            expected_bytes,
            received_bytes: 0,
            truncated: false,
        }
    }

    /// Fraction received, when the total size is known
    pub fn fraction(&self) -> Option<f32> {
        (self.expected_bytes > 0).then(|| self.received_bytes as f32 / self.expected_bytes as f32)
    }

    /// Whether the body arrived in full
    ///
    /// Without an advertised size only a truncated stream can be detected.
    pub fn is_complete(&self) -> bool {
        !self.truncated && (self.expected_bytes == 0 || self.received_bytes == self.expected_bytes)
    }

    /// Copy `body` into the destination file
    ///
    /// Progress is reported as a fraction capped at 0.99 until the transfer
    /// has been verified.
    pub fn stream(
        &mut self,
        body: &mut dyn Read,
        progress: Option<&(dyn Fn(f32) + Send)>,
    ) -> Result<()> {
        let mut file = File::create(&self.destination)?;
        let mut buffer = [0u8; CHUNK_SIZE];

        loop {
            let bytes_read = match body.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    log::warn!("Download of {} ended early: {}", self.url, e);
                    self.truncated = true;
                    break;
                }
                Err(e) => return Err(ProvisionError::Io(e)),
            };

            file.write_all(&buffer[..bytes_read])?;
            self.received_bytes += bytes_read as u64;

            if let (Some(cb), Some(fraction)) = (progress, self.fraction()) {
                cb(fraction.min(0.99));
            }
        }

        file.flush()?;
        Ok(())
    }
}
