//! In-process BVC server driven over a C ABI.
//!
//! Lifecycle: `create(config_json)` returns an opaque handle, `start(handle)`
//! blocks on a dedicated thread until `stop(handle)` is signalled from any
//! other thread, and `destroy(handle)` frees it once `start` has returned.
//! While running, payloads go straight to `update_positions` instead of
//! over HTTP.

use crate::config::{EmbeddedConfig, RuntimeConfig};
use crate::error::NativeBridgeError;
use crate::protocol::Payload;
use crate::transport::PositionSink;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Client id the native server expects from Minecraft-side adapters.
pub const MINECRAFT_CLIENT_ID: &str = "a17f9693-f01f-4d1d-ad12-1f179478375d";

/// Upper bound on waiting for the server thread after `stop`.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

const SERVER_THREAD_NAME: &str = "bvc-server";

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

/// Opaque server handle. Never zero: a null pointer from `create` is a
/// failure, not a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServerHandle(NonZeroUsize);

impl ServerHandle {
    pub fn from_raw(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(Self)
    }

    pub fn as_raw(&self) -> usize {
        self.0.get()
    }
}

/// The native server's exported surface. Integer returns are `0` on
/// success and `-1` on error, with details in [`NativeBridge::last_error`].
pub trait NativeBridge: Send + Sync {
    /// One-time crypto provider setup. Safe to call repeatedly.
    fn init(&self) -> i32;

    fn version(&self) -> String;

    fn create(&self, config_json: &str) -> Option<ServerHandle>;

    /// Blocks until the server shuts down.
    fn start(&self, handle: ServerHandle) -> i32;

    /// Non-blocking shutdown signal.
    fn stop(&self, handle: ServerHandle) -> i32;

    /// Only valid once `start` has returned.
    fn destroy(&self, handle: ServerHandle) -> i32;

    fn update_positions(&self, handle: ServerHandle, game_data_json: &str) -> i32;

    fn last_error(&self) -> Option<String>;
}

// ---------------------------------------------------------------------------
// Runtime config blob
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NativeRuntimeConfig {
    pub database: DatabaseSection,
    pub server: ServerSection,
    pub log: LogSection,
    pub voice: VoiceSection,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DatabaseSection {
    pub scheme: String,
    pub database: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServerSection {
    pub listen: String,
    pub port: u16,
    pub quic_port: u16,
    pub public_addr: String,
    pub assets_path: String,
    pub tls: TlsSection,
    pub minecraft: MinecraftSection,
}

/// `certificate`/`key` serve HTTPS and must be CA-signed; `certs_path` holds
/// the self-generated CA used for QUIC client auth.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TlsSection {
    pub certificate: String,
    pub key: String,
    pub so_reuse_port: bool,
    pub certs_path: String,
    pub names: Vec<String>,
    pub ips: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MinecraftSection {
    pub access_token: String,
    pub client_id: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LogSection {
    pub level: String,
    pub out: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VoiceSection {
    pub broadcast_range: f32,
}

/// Build the blob handed to `create`. A blank access token is replaced with
/// a random UUIDv4.
pub fn build_runtime_config(config: &RuntimeConfig, data_dir: &Path) -> NativeRuntimeConfig {
    let embedded: &EmbeddedConfig = &config.embedded_config;
    let dir = data_dir.display().to_string();
    let access_token = config
        .token()
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    NativeRuntimeConfig {
        database: DatabaseSection {
            scheme: "sqlite3".into(),
            database: format!("{}/bvc.sqlite3", dir),
        },
        server: ServerSection {
            listen: "0.0.0.0".into(),
            port: embedded.http_port,
            quic_port: embedded.quic_port,
            public_addr: embedded.public_addr.clone(),
            assets_path: format!("{}/assets", dir),
            tls: TlsSection {
                certificate: embedded.tls_certificate.clone(),
                key: embedded.tls_key.clone(),
                so_reuse_port: false,
                certs_path: format!("{}/certificates", dir),
                names: embedded.tls_names.clone(),
                ips: embedded.tls_ips.clone(),
            },
            minecraft: MinecraftSection {
                access_token,
                client_id: MINECRAFT_CLIENT_ID.into(),
            },
        },
        log: LogSection {
            level: embedded.log_level.clone(),
            out: "stdout".into(),
        },
        voice: VoiceSection {
            broadcast_range: embedded.broadcast_range,
        },
    }
}

/// Create `data_dir` plus its `certificates/` and `assets/` children and
/// return the absolute path.
fn prepare_data_dir(data_dir: &Path) -> Result<PathBuf, NativeBridgeError> {
    let dir_error = |path: &Path, source| NativeBridgeError::DataDir {
        path: path.display().to_string(),
        source,
    };

    for dir in [
        data_dir.to_path_buf(),
        data_dir.join("certificates"),
        data_dir.join("assets"),
    ] {
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| dir_error(&dir, e))?;
            debug!("Created directory: {}", dir.display());
        }
    }

    std::path::absolute(data_dir).map_err(|e| dir_error(data_dir, e))
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

pub struct EmbeddedServer {
    bridge: Arc<dyn NativeBridge>,
    /// `None` once stopped. Held across every FFI call that uses the handle,
    /// so an update can never race `destroy`.
    handle: Mutex<Option<ServerHandle>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl EmbeddedServer {
    pub fn start(
        bridge: Arc<dyn NativeBridge>,
        config: &RuntimeConfig,
        data_dir: &Path,
    ) -> Result<Self, NativeBridgeError> {
        if !config.use_embedded_server {
            return Err(NativeBridgeError::NotEnabled);
        }
        let embedded = &config.embedded_config;
        if !embedded.has_tls_certificates() {
            return Err(NativeBridgeError::MissingTls);
        }

        let data_dir = prepare_data_dir(data_dir)?;

        if bridge.init() != 0 {
            warn!("Native crypto init failed (may already be initialized)");
        }
        info!("Native library version: {}", bridge.version());

        let config_json = serde_json::to_string(&build_runtime_config(config, &data_dir))?;
        debug!("Creating embedded server in {}", data_dir.display());

        let handle = bridge.create(&config_json).ok_or_else(|| {
            NativeBridgeError::Create(
                bridge
                    .last_error()
                    .unwrap_or_else(|| "unknown error".to_string()),
            )
        })?;

        let thread_bridge = Arc::clone(&bridge);
        let spawned = std::thread::Builder::new()
            .name(SERVER_THREAD_NAME.into())
            .spawn(move || {
                info!("BVC server thread starting");
                match thread_bridge.start(handle) {
                    0 => info!("BVC server thread exited cleanly"),
                    code => error!(
                        "BVC server exited with error {}: {}",
                        code,
                        thread_bridge.last_error().unwrap_or_default()
                    ),
                }
            });

        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                bridge.destroy(handle);
                return Err(NativeBridgeError::Start(e));
            }
        };

        info!(
            "Embedded BVC server started (HTTP:{}, QUIC:{})",
            embedded.http_port, embedded.quic_port
        );

        Ok(Self {
            bridge,
            handle: Mutex::new(Some(handle)),
            thread: Mutex::new(Some(thread)),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.lock().is_some()
            && self
                .thread
                .lock()
                .as_ref()
                .is_some_and(|t| !t.is_finished())
    }

    /// Push a serialised payload directly into the server.
    pub fn update_positions(&self, game_data_json: &str) -> bool {
        let guard = self.handle.lock();
        let Some(handle) = *guard else {
            return false;
        };
        if self.bridge.update_positions(handle, game_data_json) == 0 {
            true
        } else {
            warn!(
                "Failed to update positions: {}",
                self.bridge.last_error().unwrap_or_default()
            );
            false
        }
    }

    /// Signal shutdown, wait up to [`STOP_TIMEOUT`] for the thread, then
    /// destroy the handle. Idempotent.
    ///
    /// If the thread is still inside `start` after the timeout the handle is
    /// leaked rather than destroyed under it.
    pub fn stop(&self) {
        // Released before joining: updaters see `None` and return at once.
        let Some(handle) = self.handle.lock().take() else {
            return;
        };

        info!("Stopping embedded BVC server");
        if self.bridge.stop(handle) != 0 {
            warn!(
                "Stop signal failed: {}",
                self.bridge.last_error().unwrap_or_default()
            );
        }

        let finished = match self.thread.lock().take() {
            Some(thread) => join_within(thread, STOP_TIMEOUT),
            None => true,
        };

        if finished {
            self.bridge.destroy(handle);
            info!("Embedded BVC server stopped");
        } else {
            warn!(
                "BVC server thread did not stop within {}s; leaving handle alive",
                STOP_TIMEOUT.as_secs()
            );
        }
    }
}

/// `JoinHandle::join` with an upper bound. Returns `false` on timeout; the
/// thread is then left detached.
fn join_within(thread: JoinHandle<()>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !thread.is_finished() {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    if thread.join().is_err() {
        warn!("BVC server thread panicked");
    }
    true
}

impl PositionSink for EmbeddedServer {
    fn submit(&self, payload: Payload) {
        match payload.to_json() {
            Ok(json) => {
                if self.update_positions(&json) {
                    debug!("Updated positions for {} players via FFI", payload.len());
                }
            }
            Err(e) => warn!("Failed to serialize payload for FFI: {}", e),
        }
    }

    fn is_available(&self) -> bool {
        self.is_running()
    }
}

impl Drop for EmbeddedServer {
    fn drop(&mut self) {
        self.stop();
    }
}
