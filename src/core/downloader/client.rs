use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use md5::Md5;
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::http::{HttpFetch, ReqwestFetcher};
use crate::core::config::InstallerConfig;
use crate::core::error::{InstallError, InstallResult};

/// Digests a download must match before it is moved into place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Digests {
    pub sha1: Option<String>,
    pub md5: Option<String>,
}

impl Digests {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn sha1(expected: impl Into<String>) -> Self {
        Self {
            sha1: Some(expected.into()),
            md5: None,
        }
    }

    pub fn with_md5(mut self, expected: impl Into<String>) -> Self {
        self.md5 = Some(expected.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded { bytes: u64 },
    /// The destination existed already; nothing was requested.
    AlreadyPresent,
}

/// Idempotent, digest-verified downloader.
///
/// Bytes are streamed into a temporary file beside the destination and
/// renamed over it only after every digest matched, so a destination
/// that exists is always complete.
#[derive(Clone)]
pub struct Downloader {
    http: Arc<dyn HttpFetch>,
    timeout: Duration,
    cancel: CancellationToken,
}

impl Downloader {
    pub fn new(http: Arc<dyn HttpFetch>) -> Self {
        Self {
            http,
            timeout: Duration::from_secs(120),
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(config: &InstallerConfig) -> InstallResult<Self> {
        let http = ReqwestFetcher::new(&config.user_agent)?;
        Ok(Self::new(Arc::new(http)).with_timeout(config.fetch_timeout()))
    }

    /// Deadline for a single fetch, from request to rename.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Download `url` to `dest` unless `dest` already exists.
    ///
    /// Existing files are trusted as-is. On any failure `dest` is left
    /// untouched and the partial temporary file is removed.
    pub async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        digests: &Digests,
    ) -> InstallResult<FetchOutcome> {
        if tokio::fs::try_exists(dest).await.unwrap_or(false) {
            debug!("Already present: {:?}", dest);
            return Ok(FetchOutcome::AlreadyPresent);
        }
        if self.cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }

        let parent = dest
            .parent()
            .ok_or_else(|| InstallError::Other(format!("{dest:?} has no parent directory")))?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(InstallError::io(parent))?;

        tokio::select! {
            _ = self.cancel.cancelled() => Err(InstallError::Cancelled),
            result = tokio::time::timeout(self.timeout, self.stream_into(url, dest, parent, digests)) => {
                match result {
                    Ok(outcome) => outcome,
                    Err(_) => Err(InstallError::Timeout {
                        url: url.to_string(),
                        after: self.timeout,
                    }),
                }
            }
        }
    }

    async fn stream_into(
        &self,
        url: &str,
        dest: &Path,
        parent: &Path,
        digests: &Digests,
    ) -> InstallResult<FetchOutcome> {
        let response = self.http.get(url).await?;
        if !response.is_success() {
            return Err(InstallError::Network {
                url: url.to_string(),
                status: response.status,
            });
        }

        let (file, temp_path) = tempfile::Builder::new()
            .prefix(".fetch-")
            .tempfile_in(parent)
            .map_err(InstallError::io(parent))?
            .into_parts();
        let mut file = tokio::fs::File::from_std(file);

        let mut sha1 = digests.sha1.as_ref().map(|_| Sha1::new());
        let mut md5 = digests.md5.as_ref().map(|_| Md5::new());
        let mut written = 0u64;

        let mut body = response.body;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            if let Some(hasher) = sha1.as_mut() {
                hasher.update(&chunk);
            }
            if let Some(hasher) = md5.as_mut() {
                hasher.update(&chunk);
            }
            file.write_all(&chunk)
                .await
                .map_err(InstallError::io(&*temp_path))?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(InstallError::io(&*temp_path))?;
        // Release the handle before the rename; Windows refuses to move open files.
        drop(file);

        if let (Some(expected), Some(hasher)) = (&digests.sha1, sha1) {
            verify(url, "SHA-1", expected, hex::encode(hasher.finalize()))?;
        }
        if let (Some(expected), Some(hasher)) = (&digests.md5, md5) {
            verify(url, "MD5", expected, hex::encode(hasher.finalize()))?;
        }

        temp_path.persist(dest).map_err(|e| InstallError::Io {
            path: dest.to_path_buf(),
            source: e.error,
        })?;

        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, written);
        Ok(FetchOutcome::Downloaded { bytes: written })
    }
}

fn verify(url: &str, algorithm: &'static str, expected: &str, actual: String) -> InstallResult<()> {
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(InstallError::HashMismatch {
            url: url.to_string(),
            algorithm,
            expected: expected.to_string(),
            actual,
        })
    }
}
