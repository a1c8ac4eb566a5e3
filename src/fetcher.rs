//! Streaming media fetcher: probe, download-to-scratch, retry, validation
//!
//! This is the core of the relay. Given a URL, the [`Fetcher`] optionally
//! probes it, then streams the body to a scratch file in bounded memory,
//! validating the response and retrying transient failures with
//! exponential backoff. Partial output is removed on every failure path.

use crate::config::{FetchConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::retry::{self, IsRetryable};
use crate::types::MediaKind;
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use std::path::Path;
use tempfile::TempPath;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Content-type fragments accepted for a relayed media download.
///
/// Anything else on a 2xx response means the host served something other
/// than the file (typically an HTML error page behind a 200).
const ACCEPTED_CONTENT_TYPES: &[&str] = &["video", "image", "application/octet-stream", "binary"];

/// Maximum number of body bytes sampled for a content-mismatch diagnostic
const MISMATCH_SNIPPET_BYTES: usize = 512;

/// A successfully fetched media file on local scratch storage.
///
/// The holder owns the file exclusively. It is unlinked when this value is
/// dropped, so the file lives exactly as long as the upload that consumes
/// it, including when the consuming task panics or is aborted. Call
/// [`FetchedFile::discard`] to release it explicitly.
pub struct FetchedFile {
    path: TempPath,
    size_bytes: u64,
    content_type: Option<String>,
}

impl FetchedFile {
    /// Location of the downloaded file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes written to disk
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// The `content-type` the host declared, if any
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Remove the file now instead of waiting for drop
    pub fn discard(self) {
        if let Err(e) = self.path.close() {
            tracing::warn!(error = %e, "failed to remove scratch file");
        }
    }
}

impl std::fmt::Debug for FetchedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchedFile")
            .field("path", &self.path.display().to_string())
            .field("size_bytes", &self.size_bytes)
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Streams remote media to scratch storage with retry and validation.
///
/// One instance is built at startup and shared by all requests: it owns
/// the process-wide HTTP client and its connection pool. Individual
/// fetches are fully independent; each attempt owns a distinct scratch
/// file.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    config: FetchConfig,
    retry: RetryConfig,
}

impl Fetcher {
    /// Build the process-wide fetcher and its connection pool
    pub fn new(config: FetchConfig, retry: RetryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build()
            .map_err(Error::Network)?;

        Ok(Self {
            client,
            config,
            retry,
        })
    }

    /// Advisory metadata probe.
    ///
    /// Issues a HEAD request with a short timeout; hosts that reject HEAD
    /// (status ≥ 400) get a plain GET whose body is never read. Any
    /// failure degrades to an empty header map: plenty of CDNs
    /// misconfigure HEAD, and a broken probe must not reject a valid
    /// download.
    pub async fn probe(&self, url: &str) -> HeaderMap {
        match self.probe_headers(url).await {
            Ok(headers) => headers,
            Err(e) => {
                tracing::debug!(url, error = %e, "probe failed, continuing without headers");
                HeaderMap::new()
            }
        }
    }

    async fn probe_headers(&self, url: &str) -> Result<HeaderMap> {
        let response = self
            .client
            .head(url)
            .timeout(self.config.probe_timeout)
            .send()
            .await?;

        if response.status().as_u16() >= 400 {
            let response = self
                .client
                .get(url)
                .timeout(self.config.probe_timeout)
                .send()
                .await?;
            return Ok(response.headers().clone());
        }

        Ok(response.headers().clone())
    }

    /// Download `url` to a fresh scratch file named with the kind's suffix.
    ///
    /// Validates the URL scheme before any network traffic, runs the
    /// advisory probe, then attempts the download under the configured
    /// retry budget. On success the caller owns the returned file; failed
    /// attempts never leave partial output behind.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for non-http(s) URLs, immediately and
    ///   without any network call
    /// - [`Error::Cancelled`] when `cancel` fires, without further retries
    /// - [`Error::RetriesExhausted`] wrapping the last attempt error once
    ///   the budget is spent
    pub async fn fetch(
        &self,
        url: &str,
        kind: MediaKind,
        cancel: &CancellationToken,
    ) -> Result<FetchedFile> {
        let url = validate_url(url)?;

        let probe_headers = self.probe(url.as_str()).await;
        if let Some(ct) = header_str(&probe_headers, CONTENT_TYPE)
            && !is_accepted_content_type(ct)
        {
            // Soft signal only: the GET's own headers are re-checked later
            tracing::warn!(url = %url, content_type = ct, "probe content-type looks non-media");
        }

        let result = retry::retry_with_backoff(&self.retry, || {
            self.attempt(&url, kind.suffix(), cancel)
        })
        .await;

        match result {
            Ok(file) => Ok(file),
            Err(e) if e.is_retryable() => Err(Error::RetriesExhausted {
                attempts: self.retry.max_attempts(),
                source: Box::new(e),
            }),
            Err(e) => Err(e),
        }
    }

    /// One download attempt.
    ///
    /// The scratch file is created only after the response headers pass
    /// validation, and is removed on every failure path (its guard is
    /// dropped before the error propagates), so at most one temporary
    /// file exists per in-flight attempt.
    async fn attempt(
        &self,
        url: &Url,
        suffix: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchedFile> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
            });
        }

        let content_type = header_str(response.headers(), CONTENT_TYPE).map(str::to_owned);
        if let Some(ct) = &content_type
            && !is_accepted_content_type(ct)
        {
            // A 200 wrapping an HTML error page; sample the body so the
            // failure can be diagnosed from the error alone
            let snippet = read_snippet(response).await;
            return Err(Error::ContentMismatch {
                content_type: ct.clone(),
                snippet,
            });
        }

        let path = tempfile::Builder::new()
            .prefix("relay-")
            .suffix(suffix)
            .tempfile_in(&self.config.scratch_dir)
            .map_err(Error::Io)?
            .into_temp_path();

        let size_bytes = self.stream_to_disk(response, &path, cancel).await?;

        Ok(FetchedFile {
            path,
            size_bytes,
            content_type,
        })
    }

    /// Stream the response body to `path` chunk by chunk.
    ///
    /// Chunks pass through a bounded buffered writer, so memory use stays
    /// flat regardless of payload size.
    async fn stream_to_disk(
        &self,
        response: reqwest::Response,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let file = tokio::fs::File::create(path).await.map_err(Error::Io)?;
        let mut writer = BufWriter::with_capacity(self.config.write_buffer_bytes, file);
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let chunk = chunk.map_err(Error::Network)?;
            writer.write_all(&chunk).await.map_err(Error::Io)?;
            written += chunk.len() as u64;
        }

        writer.flush().await.map_err(Error::Io)?;
        Ok(written)
    }
}

/// Accept only http/https URLs, before any network call.
///
/// `Url::parse` lowercases the scheme, so the check is case-insensitive.
fn validate_url(raw: &str) -> Result<Url> {
    let parsed = Url::parse(raw.trim())
        .map_err(|e| Error::Validation(format!("invalid URL '{raw}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(Error::Validation(format!(
            "unsupported URL scheme '{other}': only http and https are allowed"
        ))),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: reqwest::header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn is_accepted_content_type(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ACCEPTED_CONTENT_TYPES.iter().any(|accepted| ct.contains(accepted))
}

/// Read up to [`MISMATCH_SNIPPET_BYTES`] of the body for diagnostics,
/// dropping the rest of the stream.
async fn read_snippet(response: reqwest::Response) -> String {
    let mut sample: Vec<u8> = Vec::with_capacity(MISMATCH_SNIPPET_BYTES);
    let mut stream = response.bytes_stream();

    while sample.len() < MISMATCH_SNIPPET_BYTES {
        match stream.next().await {
            Some(Ok(chunk)) => {
                let room = MISMATCH_SNIPPET_BYTES - sample.len();
                let take = room.min(chunk.len());
                sample.extend_from_slice(&chunk[..take]);
            }
            // The sample is best-effort; a read error just ends it
            _ => break,
        }
    }

    String::from_utf8_lossy(&sample).into_owned()
}
