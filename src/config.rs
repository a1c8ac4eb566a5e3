//! Configuration types for media-relay

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Environment variable holding the required Bot API token
pub const ENV_BOT_TOKEN: &str = "TG_BOT_TOKEN";
/// Environment variable overriding the Bot API base URL
pub const ENV_API_BASE: &str = "TG_API_BASE";
/// Environment variable overriding the HTTP bind address
pub const ENV_BIND_ADDR: &str = "RELAY_BIND_ADDR";
/// Environment variable overriding the scratch directory
pub const ENV_SCRATCH_DIR: &str = "RELAY_SCRATCH_DIR";

/// Messaging platform credentials and endpoint
///
/// The token is the only required credential; startup fails without it.
/// The API base is overridable so tests can point the sender at a mock
/// server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token (required, sourced from `TG_BOT_TOKEN`)
    #[serde(default)]
    pub bot_token: String,

    /// Bot API base URL (default: "https://api.telegram.org")
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: default_api_base(),
        }
    }
}

/// Download behavior configuration (scratch storage, probe, connection pool)
///
/// Groups settings for how remote media is fetched to local scratch
/// storage. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Scratch directory for in-flight downloads (default: OS temp dir)
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// User agent sent to media hosts. Defaults to a desktop browser
    /// string; plenty of hosts reject unbranded clients.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for the advisory HEAD probe (default: 10 seconds).
    /// The main transfer carries no overall timeout; it is bounded by
    /// chunked reads instead.
    #[serde(default = "default_probe_timeout", with = "duration_serde")]
    pub probe_timeout: Duration,

    /// Buffered-writer capacity for streaming to disk (default: 1 MiB)
    #[serde(default = "default_write_buffer_bytes")]
    pub write_buffer_bytes: usize,

    /// Maximum idle keep-alive connections per host (default: 5)
    #[serde(default = "default_max_idle_per_host")]
    pub max_idle_per_host: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            user_agent: default_user_agent(),
            probe_timeout: default_probe_timeout(),
            write_buffer_bytes: default_write_buffer_bytes(),
            max_idle_per_host: default_max_idle_per_host(),
        }
    }
}

/// Retry configuration for transient download failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the initial attempt (default: 4, i.e. 5 attempts total)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Cap applied to the exponential backoff curve (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Total attempt budget: the initial attempt plus all retries
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// API server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bind address for the HTTP server (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS (default: true; the expected caller is a browser
    /// userscript)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins ("*" for any, default)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Main configuration for the relay service
///
/// Fields are organized into logical sub-configs:
/// - [`telegram`](TelegramConfig) — credentials and platform endpoint
/// - [`fetch`](FetchConfig) — scratch storage, probe, connection pool
/// - [`retry`](RetryConfig) — backoff policy for transient failures
/// - [`server`](ApiConfig) — HTTP server settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Messaging platform credentials and endpoint
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Download behavior settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Retry/backoff policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// API server settings
    #[serde(default)]
    pub server: ApiConfig,
}

impl Config {
    /// Build the configuration from process environment variables.
    ///
    /// `TG_BOT_TOKEN` is required; its absence is a fatal startup error.
    /// `TG_API_BASE`, `RELAY_BIND_ADDR` and `RELAY_SCRATCH_DIR` override
    /// their defaults when present.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Factoring the lookup out keeps this a pure function: tests feed it
    /// maps instead of mutating process state.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bot_token = get(ENV_BOT_TOKEN)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::Config {
                message: format!("missing required environment variable {ENV_BOT_TOKEN}"),
                key: Some(ENV_BOT_TOKEN.to_string()),
            })?;

        let mut config = Config {
            telegram: TelegramConfig {
                bot_token,
                ..TelegramConfig::default()
            },
            ..Config::default()
        };

        if let Some(base) = get(ENV_API_BASE) {
            config.telegram.api_base = base.trim_end_matches('/').to_string();
        }

        if let Some(addr) = get(ENV_BIND_ADDR) {
            config.server.bind_address = addr.parse().map_err(|e| Error::Config {
                message: format!("invalid bind address '{addr}': {e}"),
                key: Some(ENV_BIND_ADDR.to_string()),
            })?;
        }

        if let Some(dir) = get(ENV_SCRATCH_DIR) {
            config.fetch.scratch_dir = PathBuf::from(dir);
        }

        Ok(config)
    }
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120 Safari/537.36"
        .to_string()
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_write_buffer_bytes() -> usize {
    1024 * 1024
}

fn default_max_idle_per_host() -> usize {
    5
}

fn default_max_retries() -> u32 {
    4
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_bind_address() -> SocketAddr {
    // All interfaces; the service is meant to sit behind a PaaS ingress
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
