//! Error types for the telemetry pipeline.
//!
//! None of these ever reach the host's tick loop: each is caught where it
//! happens and turned into a log line.

use thiserror::Error;

/// Configuration could not be loaded, saved or fails validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[from] config::ConfigError),

    #[error("failed to write config: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// External mode needs both a server URL and an access token.
    #[error(
        "invalid configuration: bvc-server={}, access-token={}",
        presence(*server_set),
        presence(*token_set)
    )]
    Invalid { server_set: bool, token_set: bool },
}

fn presence(set: bool) -> &'static str {
    if set {
        "set"
    } else {
        "MISSING"
    }
}

/// The host's player state is unavailable as a whole for this tick.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("host state unavailable: {0}")]
    HostUnavailable(String),
}

/// A single player whose state could not be read this tick.
#[derive(Debug, Clone, Error)]
#[error("player '{name}' unreadable: {reason}")]
pub struct UnreadablePlayer {
    pub name: String,
    pub reason: String,
}

impl UnreadablePlayer {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// One delivery attempt failed. Logged and discarded, never retried.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("transport setup failed: {0}")]
    Setup(String),
}

/// Embedded-mode failures against the native server library.
#[derive(Debug, Error)]
pub enum NativeBridgeError {
    #[error("embedded server mode is not enabled")]
    NotEnabled,

    #[error("embedded server requires tls-certificate and tls-key in embedded-config")]
    MissingTls,

    #[error("failed to prepare data directory {path}: {source}")]
    DataDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create server: {0}")]
    Create(String),

    #[error("failed to start server thread: {0}")]
    Start(#[source] std::io::Error),

    #[error("failed to serialize runtime config: {0}")]
    Config(#[from] serde_json::Error),
}
