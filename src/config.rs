//! Configuration types for trade-bot

use crate::exchange::{Credentials, KRAKEN_FUTURES_API_URL};
use crate::stream::{StreamConfig, KRAKEN_FUTURES_WS_URL};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub stream: StreamSettings,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Users seeded into the in-memory store
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

/// Gateway listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// REST command client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    KRAKEN_FUTURES_API_URL.to_string()
}
fn default_request_timeout_secs() -> u64 {
    10
}

impl ExchangeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Market data stream configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StreamSettings {
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Dial attempts before giving up
    #[serde(default = "default_max_dial_attempts")]
    pub max_dial_attempts: u32,

    /// Largest accepted message (bytes)
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Keepalive deadline (seconds)
    #[serde(default = "default_pong_wait_secs")]
    pub pong_wait_secs: u64,

    /// Ping interval (seconds); must be shorter than the keepalive deadline
    #[serde(default = "default_ping_period_secs")]
    pub ping_period_secs: u64,
}

fn default_ws_url() -> String {
    KRAKEN_FUTURES_WS_URL.to_string()
}
fn default_max_dial_attempts() -> u32 {
    10
}
fn default_max_message_size() -> usize {
    512 * 1024
}
fn default_pong_wait_secs() -> u64 {
    60
}
fn default_ping_period_secs() -> u64 {
    54 // 90% of pong wait
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            max_dial_attempts: default_max_dial_attempts(),
            max_message_size: default_max_message_size(),
            pong_wait_secs: default_pong_wait_secs(),
            ping_period_secs: default_ping_period_secs(),
        }
    }
}

impl StreamSettings {
    /// Streaming client configuration for these settings
    pub fn client_config(&self) -> StreamConfig {
        StreamConfig::new(self.ws_url.clone())
            .max_dial_attempts(self.max_dial_attempts)
            .max_message_size(self.max_message_size)
            .pong_wait(Duration::from_secs(self.pong_wait_secs))
            .ping_period(Duration::from_secs(self.ping_period_secs))
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit JSON log lines
    #[serde(default)]
    pub json: bool,
    /// Prometheus exporter port; disabled when unset
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
            metrics_port: None,
        }
    }
}

/// A user with a bearer token and exchange API keys
#[derive(Clone, Deserialize)]
pub struct UserConfig {
    pub id: i64,
    pub token: String,
    pub public_key: String,
    pub private_key: String,
}

impl UserConfig {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.public_key.clone(), self.private_key.clone())
    }
}

impl std::fmt::Debug for UserConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserConfig")
            .field("id", &self.id)
            .field("token", &"<redacted>")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the runtime cannot honour
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.stream.ping_period_secs == 0 {
            anyhow::bail!("stream.ping_period_secs must be at least 1");
        }
        if self.stream.ping_period_secs >= self.stream.pong_wait_secs {
            anyhow::bail!(
                "stream.ping_period_secs ({}) must be shorter than stream.pong_wait_secs ({})",
                self.stream.ping_period_secs,
                self.stream.pong_wait_secs
            );
        }
        if self.stream.max_dial_attempts == 0 {
            anyhow::bail!("stream.max_dial_attempts must be at least 1");
        }

        let mut tokens = std::collections::HashSet::new();
        for user in &self.users {
            if !tokens.insert(user.token.as_str()) {
                anyhow::bail!("duplicate token for user {}", user.id);
            }
        }
        Ok(())
    }
}
