//! Messaging-platform collaborator: the [`MediaSender`] seam and its
//! Bot API implementation
//!
//! The relay treats the messaging client as an opaque collaborator behind
//! a trait object, so the transport can be swapped (or faked in tests)
//! without touching the pipeline. The shipped implementation speaks the
//! Telegram Bot API over HTTPS multipart, streaming the local file instead
//! of loading it into memory.

use crate::config::TelegramConfig;
use crate::error::{Error, Result};
use crate::types::{MessageId, ParseMode};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;

/// Timeout for small control calls (credential check); uploads themselves
/// run without an overall deadline.
const CONTROL_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivery half of the relay: uploads a local media file to a destination
/// within the messaging platform.
///
/// Implementations may fail transiently or fatally; the relay surfaces
/// either as [`Error::Upload`] and never retries uploads. The retry
/// budget belongs to the download side only.
#[async_trait]
pub trait MediaSender: Send + Sync {
    /// Verify credentials / open the session. Called once at startup;
    /// a failure here is fatal.
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Release the session. Called once at shutdown.
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    /// Upload a video file and return the created message's id
    async fn send_video(
        &self,
        destination: &str,
        file: &Path,
        caption: Option<&str>,
        parse_mode: ParseMode,
    ) -> Result<MessageId>;

    /// Upload a photo file and return the created message's id
    async fn send_photo(
        &self,
        destination: &str,
        file: &Path,
        caption: Option<&str>,
        parse_mode: ParseMode,
    ) -> Result<MessageId>;
}

/// Response envelope common to all Bot API methods
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

/// The slice of a sent message we care about
#[derive(Debug, Default, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Telegram Bot API implementation of [`MediaSender`]
pub struct BotApiSender {
    client: reqwest::Client,
    config: TelegramConfig,
}

impl BotApiSender {
    /// Build the sender and its dedicated HTTP client
    pub fn new(config: TelegramConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(Error::Network)?;

        Ok(Self { client, config })
    }

    fn method_url(&self, api_method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token,
            api_method
        )
    }

    /// Upload `file` through one of the media methods.
    ///
    /// The file goes out as a length-hinted multipart stream, so payloads
    /// of hundreds of megabytes pass through in constant memory.
    #[allow(clippy::too_many_arguments)]
    async fn send_media(
        &self,
        api_method: &str,
        field: &str,
        mime: &str,
        destination: &str,
        file: &Path,
        caption: Option<&str>,
        parse_mode: ParseMode,
        extra: &[(&str, &str)],
    ) -> Result<MessageId> {
        let metadata = tokio::fs::metadata(file).await.map_err(Error::Io)?;
        let handle = tokio::fs::File::open(file).await.map_err(Error::Io)?;

        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("media")
            .to_string();
        let part = reqwest::multipart::Part::stream_with_length(
            reqwest::Body::wrap_stream(ReaderStream::new(handle)),
            metadata.len(),
        )
        .file_name(file_name)
        .mime_str(mime)
        .map_err(Error::Network)?;

        let mut form = reqwest::multipart::Form::new()
            .text("chat_id", destination.to_string())
            .part(field.to_string(), part);
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }
        if let Some(mode) = parse_mode.as_api_value() {
            form = form.text("parse_mode", mode);
        }
        for (key, value) in extra {
            form = form.text((*key).to_string(), (*value).to_string());
        }

        let response = self
            .client
            .post(self.method_url(api_method))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let envelope: ApiEnvelope<SentMessage> = response.json().await.map_err(|e| {
            Error::Upload(format!(
                "unreadable {api_method} response (status {status}): {e}"
            ))
        })?;

        match envelope {
            ApiEnvelope {
                ok: true,
                result: Some(message),
                ..
            } => {
                tracing::debug!(
                    method = api_method,
                    message_id = message.message_id,
                    "media uploaded"
                );
                Ok(MessageId(message.message_id))
            }
            ApiEnvelope { description, .. } => Err(Error::Upload(
                description
                    .unwrap_or_else(|| format!("{api_method} rejected with status {status}")),
            )),
        }
    }
}

#[async_trait]
impl MediaSender for BotApiSender {
    /// `getMe` as a credential check, so a bad token fails the process at
    /// startup instead of on the first relayed file.
    async fn init(&self) -> Result<()> {
        let response = self
            .client
            .get(self.method_url("getMe"))
            .timeout(CONTROL_CALL_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        let envelope: ApiEnvelope<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| Error::Upload(format!("unreadable getMe response: {e}")))?;

        if !envelope.ok {
            return Err(Error::Config {
                message: format!(
                    "bot credential check failed (status {status}): {}",
                    envelope.description.unwrap_or_else(|| "no description".to_string())
                ),
                key: Some(crate::config::ENV_BOT_TOKEN.to_string()),
            });
        }

        tracing::info!("bot credentials verified");
        Ok(())
    }

    async fn send_video(
        &self,
        destination: &str,
        file: &Path,
        caption: Option<&str>,
        parse_mode: ParseMode,
    ) -> Result<MessageId> {
        self.send_media(
            "sendVideo",
            "video",
            "video/mp4",
            destination,
            file,
            caption,
            parse_mode,
            &[("supports_streaming", "true")],
        )
        .await
    }

    async fn send_photo(
        &self,
        destination: &str,
        file: &Path,
        caption: Option<&str>,
        parse_mode: ParseMode,
    ) -> Result<MessageId> {
        self.send_media(
            "sendPhoto",
            "photo",
            "image/jpeg",
            destination,
            file,
            caption,
            parse_mode,
            &[],
        )
        .await
    }
}
