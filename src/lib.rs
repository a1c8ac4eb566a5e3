//! # media-relay
//!
//! HTTP relay that mirrors remote media files into Telegram chats.
//!
//! Given a URL and a destination, the relay streams the remote resource to
//! local scratch storage (retrying transient failures with exponential
//! backoff and validating the content on the way), then re-uploads it via
//! the messaging platform's API and returns the resulting message id. The
//! caller (typically a browser userscript or an automation node) never
//! touches credentials or large-file handling.
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_relay::{Config, Relay};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let relay = Arc::new(Relay::new(&config).await?);
//!
//!     // Serve until SIGTERM/SIGINT, then shut the relay down
//!     media_relay::run_with_shutdown(relay, Arc::new(config)).await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Streaming media fetcher (the core pipeline)
pub mod fetcher;
/// Relay composition root and lifecycle
pub mod relay;
/// Retry logic with exponential backoff
pub mod retry;
/// Messaging-platform collaborator
pub mod sender;
/// Core domain types and request normalization
pub mod types;

// Re-export commonly used types
pub use config::{ApiConfig, Config, FetchConfig, RetryConfig, TelegramConfig};
pub use error::{ApiError, Error, ErrorDetail, Result, ToHttpStatus};
pub use fetcher::{FetchedFile, Fetcher};
pub use relay::Relay;
pub use sender::{BotApiSender, MediaSender};
pub use types::{MediaKind, MessageId, ParseMode, RawUploadRequest, UploadRequest};

use std::sync::Arc;

/// Serve the API until a termination signal arrives, then shut down.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal
///   registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// When the server stops (signal or bind/serve failure) the relay's
/// shutdown hook runs before this returns.
pub async fn run_with_shutdown(relay: Arc<Relay>, config: Arc<Config>) -> Result<()> {
    let serve_result = {
        let relay = relay.clone();
        tokio::select! {
            result = api::start_api_server(relay, config) => result,
            _ = wait_for_signal() => Ok(()),
        }
    };

    relay.shutdown().await?;
    serve_result
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers,
    // tests); degrade step by step rather than giving up
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("received SIGTERM");
                }
                _ = sigint.recv() => {
                    tracing::info!("received SIGINT (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("received SIGINT (Ctrl+C)");
            } else {
                tracing::error!("could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("received SIGTERM");
            } else {
                tracing::error!("could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("received Ctrl+C");
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
        }
    }
}
