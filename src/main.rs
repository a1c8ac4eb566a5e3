//! media-relay service binary
//!
//! Wires environment configuration, the relay (with its credential check),
//! and the HTTP server together, and runs until a termination signal.

use media_relay::{Config, Relay};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "media_relay=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        bind_address = %config.server.bind_address,
        scratch_dir = %config.fetch.scratch_dir.display(),
        "starting media relay"
    );

    let relay = Arc::new(Relay::new(&config).await?);
    media_relay::run_with_shutdown(relay, Arc::new(config)).await?;

    Ok(())
}
