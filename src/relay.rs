//! Process-scoped composition root: fetch, upload, cleanup
//!
//! One [`Relay`] is built at startup and shared (Arc-wrapped) by every
//! request. It owns the long-lived [`Fetcher`] and the messaging client
//! handle; neither is ever re-created per request.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::Fetcher;
use crate::sender::{BotApiSender, MediaSender};
use crate::types::{MediaKind, MessageId, UploadRequest};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

/// The relay service: streams a remote file to scratch storage, uploads it
/// to the messaging platform, and always releases the scratch file.
pub struct Relay {
    fetcher: Fetcher,
    sender: Arc<dyn MediaSender>,
    /// Cleared during shutdown; new deliveries are rejected once false
    accepting: AtomicBool,
}

impl Relay {
    /// Build the relay with the default Bot API sender.
    ///
    /// Creates the scratch directory, builds the shared fetcher, and runs
    /// the sender's credential check, so a bad token fails at startup.
    pub async fn new(config: &Config) -> Result<Self> {
        let sender = Arc::new(BotApiSender::new(config.telegram.clone())?);
        Self::with_sender(config, sender).await
    }

    /// Build the relay around an externally supplied sender
    /// (tests, alternative transports).
    pub async fn with_sender(config: &Config, sender: Arc<dyn MediaSender>) -> Result<Self> {
        tokio::fs::create_dir_all(&config.fetch.scratch_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "failed to create scratch directory '{}': {e}",
                        config.fetch.scratch_dir.display()
                    ),
                ))
            })?;

        let fetcher = Fetcher::new(config.fetch.clone(), config.retry.clone())?;
        sender.init().await?;

        Ok(Self {
            fetcher,
            sender,
            accepting: AtomicBool::new(true),
        })
    }

    /// Relay one file: fetch it locally, upload it, release the local copy.
    ///
    /// The scratch file is removed whether or not the upload succeeds; a
    /// failed upload surfaces its error after cleanup.
    pub async fn deliver(&self, request: &UploadRequest) -> Result<MessageId> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let cancel = CancellationToken::new();
        let file = self
            .fetcher
            .fetch(&request.source_url, request.kind, &cancel)
            .await?;

        tracing::info!(
            url = %request.source_url,
            destination = %request.destination,
            kind = ?request.kind,
            size_bytes = file.size_bytes(),
            "media fetched, uploading"
        );

        let sent = match request.kind {
            MediaKind::Video => {
                self.sender
                    .send_video(
                        &request.destination,
                        file.path(),
                        request.caption.as_deref(),
                        request.parse_mode,
                    )
                    .await
            }
            MediaKind::Photo => {
                self.sender
                    .send_photo(
                        &request.destination,
                        file.path(),
                        request.caption.as_deref(),
                        request.parse_mode,
                    )
                    .await
            }
        };

        file.discard();

        match &sent {
            Ok(message_id) => {
                tracing::info!(%message_id, destination = %request.destination, "media delivered");
            }
            Err(e) => {
                tracing::error!(error = %e, destination = %request.destination, "upload failed");
            }
        }

        sent
    }

    /// Stop accepting new deliveries and close the sender session.
    ///
    /// In-flight deliveries are left to finish; only new ones are turned
    /// away with [`Error::ShuttingDown`].
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("relay shutting down");
        self.accepting.store(false, Ordering::SeqCst);
        self.sender.shutdown().await
    }
}


// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::test_helpers::RecordingSender;
    use super::*;
    use crate::config::{FetchConfig, RetryConfig};
    use crate::types::{ParseMode, RawUploadRequest};
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(scratch: &std::path::Path) -> Config {
        Config {
            fetch: FetchConfig {
                scratch_dir: scratch.to_path_buf(),
                probe_timeout: Duration::from_secs(2),
                ..FetchConfig::default()
            },
            retry: RetryConfig {
                max_retries: 1,
                initial_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(100),
                backoff_multiplier: 2.0,
                jitter: false,
            },
            ..Config::default()
        }
    }

    async fn media_host(body: &[u8]) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("content-type", "video/mp4"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "video/mp4")
                    .set_body_bytes(body.to_vec()),
            )
            .mount(&server)
            .await;
        server
    }

    fn upload_request(server: &MockServer, kind: &str) -> UploadRequest {
        RawUploadRequest {
            chat_id: Some("@target".into()),
            file_url: Some(format!("{}/clip", server.uri())),
            caption: Some("caption text".into()),
            parse_mode: Some("HTML".into()),
            kind: Some(kind.into()),
            url: None,
        }
        .normalize()
        .unwrap()
    }

    #[tokio::test]
    async fn deliver_fetches_uploads_and_cleans_up() {
        let server = media_host(b"video payload").await;
        let scratch = TempDir::new().unwrap();
        let sender = Arc::new(RecordingSender::succeeding(99));
        let relay = Relay::with_sender(&test_config(scratch.path()), sender.clone())
            .await
            .unwrap();

        let message_id = relay.deliver(&upload_request(&server, "video")).await.unwrap();
        assert_eq!(message_id, MessageId(99));

        let calls = sender.calls.lock().await;
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.operation, "sendVideo");
        assert_eq!(call.destination, "@target");
        assert_eq!(call.caption.as_deref(), Some("caption text"));
        assert_eq!(call.parse_mode, ParseMode::Html);
        assert!(call.file_existed, "file must exist while the upload runs");
        assert_eq!(call.file_content.as_deref(), Some(b"video payload".as_slice()));
        assert!(
            !call.file.exists(),
            "scratch file must be removed after a successful upload"
        );
    }

    #[tokio::test]
    async fn deliver_routes_photos_to_send_photo() {
        let server = media_host(b"jpeg payload").await;
        let scratch = TempDir::new().unwrap();
        let sender = Arc::new(RecordingSender::succeeding(5));
        let relay = Relay::with_sender(&test_config(scratch.path()), sender.clone())
            .await
            .unwrap();

        relay.deliver(&upload_request(&server, "photo")).await.unwrap();

        let calls = sender.calls.lock().await;
        assert_eq!(calls[0].operation, "sendPhoto");
        assert!(
            calls[0].file.extension().is_some_and(|e| e == "jpg"),
            "photo scratch files carry the .jpg suffix"
        );
    }

    #[tokio::test]
    async fn failed_upload_still_removes_the_file() {
        let server = media_host(b"payload").await;
        let scratch = TempDir::new().unwrap();
        let sender = Arc::new(RecordingSender::failing("chat not found"));
        let relay = Relay::with_sender(&test_config(scratch.path()), sender.clone())
            .await
            .unwrap();

        let result = relay.deliver(&upload_request(&server, "video")).await;

        match result {
            Err(Error::Upload(message)) => assert!(message.contains("chat not found")),
            other => panic!("expected Upload error, got {other:?}"),
        }

        let calls = sender.calls.lock().await;
        assert!(
            !calls[0].file.exists(),
            "scratch file must be removed after a failed upload too"
        );
    }

    #[tokio::test]
    async fn failed_download_never_reaches_the_sender() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let scratch = TempDir::new().unwrap();
        let sender = Arc::new(RecordingSender::succeeding(1));
        let relay = Relay::with_sender(&test_config(scratch.path()), sender.clone())
            .await
            .unwrap();

        let result = relay.deliver(&upload_request(&server, "video")).await;

        assert!(matches!(result, Err(Error::RetriesExhausted { .. })));
        assert!(sender.calls.lock().await.is_empty());
        assert_eq!(
            std::fs::read_dir(scratch.path()).unwrap().count(),
            0,
            "no scratch file may survive a failed download"
        );
    }

    #[tokio::test]
    async fn invalid_url_never_reaches_the_sender() {
        let scratch = TempDir::new().unwrap();
        let sender = Arc::new(RecordingSender::succeeding(1));
        let relay = Relay::with_sender(&test_config(scratch.path()), sender.clone())
            .await
            .unwrap();

        let request = RawUploadRequest {
            chat_id: Some("@target".into()),
            file_url: Some("ftp://example.com/clip.mp4".into()),
            ..RawUploadRequest::default()
        }
        .normalize()
        .unwrap();

        let result = relay.deliver(&request).await;

        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(sender.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn shutdown_rejects_new_deliveries() {
        let server = media_host(b"payload").await;
        let scratch = TempDir::new().unwrap();
        let sender = Arc::new(RecordingSender::succeeding(1));
        let relay = Relay::with_sender(&test_config(scratch.path()), sender.clone())
            .await
            .unwrap();

        relay.shutdown().await.unwrap();

        let result = relay.deliver(&upload_request(&server, "video")).await;
        assert!(matches!(result, Err(Error::ShuttingDown)));
        assert!(sender.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn with_sender_creates_the_scratch_directory() {
        let scratch = TempDir::new().unwrap();
        let nested = scratch.path().join("relay").join("scratch");
        let sender = Arc::new(RecordingSender::succeeding(1));

        let _relay = Relay::with_sender(&test_config(&nested), sender).await.unwrap();

        assert!(nested.is_dir(), "scratch directory should be created at startup");
    }
}
