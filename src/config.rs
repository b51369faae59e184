//! Adapter runtime configuration.
//!
//! Loaded once at startup (TOML file layered under `BVC_*` environment
//! variables via the `config` crate), validated, then shared read-only as an
//! `Arc<RuntimeConfig>`. Keys are kebab-case; snake_case spellings (which
//! is what `BVC_*` variables map to) are accepted on load.

use crate::error::ConfigError;
use crate::types::{DeafenRule, Game};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_MINIMUM_PLAYERS: usize = 2;
/// Five game ticks at 20 TPS.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 1000;

// ---------------------------------------------------------------------------
// Runtime config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Base URL of the external BVC server.
    #[serde(
        rename = "bvc-server",
        alias = "bvcServer",
        alias = "bvc_server",
        skip_serializing_if = "Option::is_none"
    )]
    pub bvc_server: Option<String>,

    #[serde(
        rename = "access-token",
        alias = "accessToken",
        alias = "access_token",
        skip_serializing_if = "Option::is_none"
    )]
    pub access_token: Option<String>,

    /// Ticks with fewer players than this send nothing.
    #[serde(
        rename = "minimum-players",
        alias = "minimumPlayers",
        alias = "minimum_players"
    )]
    pub minimum_players: usize,

    #[serde(
        rename = "poll-interval-ms",
        alias = "pollIntervalMs",
        alias = "poll_interval_ms"
    )]
    pub poll_interval_ms: u64,

    #[serde(
        rename = "request-timeout-ms",
        alias = "requestTimeoutMs",
        alias = "request_timeout_ms"
    )]
    pub request_timeout_ms: u64,

    /// Bypass the minimum-player gate. Never bypasses validation.
    pub debug: bool,

    pub game: Game,

    #[serde(rename = "deafen-rule", alias = "deafenRule", alias = "deafen_rule")]
    pub deafen_rule: DeafenRule,

    #[serde(
        rename = "use-embedded-server",
        alias = "useEmbeddedServer",
        alias = "use_embedded_server"
    )]
    pub use_embedded_server: bool,

    #[serde(
        rename = "embedded-config",
        alias = "embeddedConfig",
        alias = "embedded_config"
    )]
    pub embedded_config: EmbeddedConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bvc_server: None,
            access_token: None,
            minimum_players: DEFAULT_MINIMUM_PLAYERS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            debug: false,
            game: Game::Minecraft,
            deafen_rule: DeafenRule::Sneaking,
            use_embedded_server: false,
            embedded_config: EmbeddedConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load from an optional TOML file, then overlay `BVC_*` env vars
    /// (e.g. `BVC_ACCESS_TOKEN`, `BVC_MINIMUM_PLAYERS`).
    ///
    /// Env values stay strings until serde sees the target field, so an
    /// all-digit token keeps its leading zeros.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix("BVC")
                .prefix_separator("_")
                .separator("__"),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Persist user-edited settings back to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let rendered = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(ConfigError::Write)?;
        }
        std::fs::write(path, rendered).map_err(ConfigError::Write)
    }

    /// Write the defaults to `path` unless a file already exists there.
    /// Returns `true` when a file was created.
    pub fn create_default_if_missing(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }
        Self::default().save(path)?;
        Ok(true)
    }

    pub fn server_url(&self) -> Option<&str> {
        non_blank(self.bvc_server.as_deref())
    }

    pub fn token(&self) -> Option<&str> {
        non_blank(self.access_token.as_deref())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    /// Embedded mode needs no remote server; external mode needs both the
    /// server URL and the access token.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.use_embedded_server {
            return Ok(());
        }
        let server_set = self.server_url().is_some();
        let token_set = self.token().is_some();
        if server_set && token_set {
            Ok(())
        } else {
            Err(ConfigError::Invalid {
                server_set,
                token_set,
            })
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Embedded server config
// ---------------------------------------------------------------------------

/// Settings for the in-process server. Only read when
/// `use-embedded-server` is on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddedConfig {
    #[serde(rename = "http-port", alias = "httpPort", alias = "http_port")]
    pub http_port: u16,

    #[serde(rename = "quic-port", alias = "quicPort", alias = "quic_port")]
    pub quic_port: u16,

    #[serde(rename = "public-addr", alias = "publicAddr", alias = "public_addr")]
    pub public_addr: String,

    #[serde(
        rename = "broadcast-range",
        alias = "broadcastRange",
        alias = "broadcast_range"
    )]
    pub broadcast_range: f32,

    /// HTTPS certificate; must be signed by a trusted CA.
    #[serde(
        rename = "tls-certificate",
        alias = "tlsCertificate",
        alias = "tls_certificate"
    )]
    pub tls_certificate: String,

    #[serde(rename = "tls-key", alias = "tlsKey", alias = "tls_key")]
    pub tls_key: String,

    #[serde(rename = "tls-names", alias = "tlsNames", alias = "tls_names")]
    pub tls_names: Vec<String>,

    #[serde(rename = "tls-ips", alias = "tlsIps", alias = "tls_ips")]
    pub tls_ips: Vec<String>,

    #[serde(rename = "log-level", alias = "logLevel", alias = "log_level")]
    pub log_level: String,
}

impl Default for EmbeddedConfig {
    fn default() -> Self {
        Self {
            http_port: 8444,
            quic_port: 8443,
            public_addr: "0.0.0.0".into(),
            broadcast_range: 32.0,
            tls_certificate: String::new(),
            tls_key: String::new(),
            tls_names: vec!["localhost".into(), "127.0.0.1".into()],
            tls_ips: vec!["127.0.0.1".into()],
            log_level: "info".into(),
        }
    }
}

impl EmbeddedConfig {
    pub fn has_tls_certificates(&self) -> bool {
        !self.tls_certificate.trim().is_empty() && !self.tls_key.trim().is_empty()
    }
}
