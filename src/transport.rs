//! Position delivery.
//!
//! [`PositionSink::submit`] hands a payload off and returns immediately; the
//! network round-trip happens on a spawned task whose only continuation is a
//! log line. No retry, no queue, no backoff: the next tick's snapshot
//! supersedes anything that was lost.

use crate::config::RuntimeConfig;
use crate::error::DeliveryError;
use crate::protocol::{position_url, Payload, ACCESS_TOKEN_HEADER, CONTENT_TYPE_JSON};
use log::{debug, warn};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

// ---------------------------------------------------------------------------
// Sink trait
// ---------------------------------------------------------------------------

/// Destination for built payloads.
pub trait PositionSink: Send + Sync {
    /// Non-blocking. Failures are logged by the sink, never returned.
    fn submit(&self, payload: Payload);

    /// Whether a submit right now has somewhere to go.
    fn is_available(&self) -> bool {
        true
    }
}

/// Completion of one HTTP delivery attempt.
pub type DeliveryTask = tokio::task::JoinHandle<Result<(), DeliveryError>>;

// ---------------------------------------------------------------------------
// HTTP transport
// ---------------------------------------------------------------------------

/// Fire-and-forget `POST {server}/api/position`.
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
    access_token: String,
    timeout: Duration,
    runtime: Handle,
}

impl HttpTransport {
    /// Build a transport bound to the current Tokio runtime.
    pub fn new(server: &str, access_token: &str, timeout: Duration) -> Result<Self, DeliveryError> {
        let runtime = Handle::try_current().map_err(|e| DeliveryError::Setup(e.to_string()))?;
        Self::with_runtime(server, access_token, timeout, runtime)
    }

    /// Build a transport that spawns onto `runtime`, so `submit` can be called
    /// from host threads that are not part of any runtime.
    pub fn with_runtime(
        server: &str,
        access_token: &str,
        timeout: Duration,
        runtime: Handle,
    ) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Setup(e.to_string()))?;

        Ok(Self {
            http,
            url: position_url(server),
            access_token: access_token.to_string(),
            timeout,
            runtime,
        })
    }

    pub fn from_config(config: &RuntimeConfig) -> Result<Self, DeliveryError> {
        let server = config
            .server_url()
            .ok_or_else(|| DeliveryError::Setup("bvc-server is not configured".into()))?;
        let token = config
            .token()
            .ok_or_else(|| DeliveryError::Setup("access-token is not configured".into()))?;
        Self::new(server, token, config.request_timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Spawn one delivery attempt and return its handle.
    ///
    /// The task logs its own outcome; awaiting the handle is optional.
    pub fn send(&self, payload: Payload) -> DeliveryTask {
        let request = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .header(ACCEPT, CONTENT_TYPE_JSON);
        let timeout_ms = self.timeout.as_millis() as u64;
        let players = payload.len();

        self.runtime.spawn(async move {
            let result = match payload.to_json_vec() {
                Ok(body) => deliver(request.body(body), timeout_ms).await,
                Err(e) => Err(DeliveryError::Serialize(e)),
            };
            match &result {
                Ok(()) => debug!("Delivered positions for {} players", players),
                Err(e) => warn!("Failed to send player data: {}", e),
            }
            result
        })
    }
}

impl PositionSink for HttpTransport {
    fn submit(&self, payload: Payload) {
        // Dropping the handle detaches the task.
        drop(self.send(payload));
    }
}

async fn deliver(request: reqwest::RequestBuilder, timeout_ms: u64) -> Result<(), DeliveryError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            DeliveryError::Timeout(timeout_ms)
        } else {
            DeliveryError::Http(e.to_string())
        }
    })?;

    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(DeliveryError::Status(status.as_u16()))
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Sends through the embedded server while it runs, otherwise over HTTP.
#[derive(Default)]
pub struct PositionRouter {
    embedded: Option<Arc<dyn PositionSink>>,
    http: Option<Arc<dyn PositionSink>>,
}

impl PositionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embedded(mut self, sink: Arc<dyn PositionSink>) -> Self {
        self.embedded = Some(sink);
        self
    }

    pub fn with_http(mut self, sink: Arc<dyn PositionSink>) -> Self {
        self.http = Some(sink);
        self
    }
}

impl PositionSink for PositionRouter {
    fn submit(&self, payload: Payload) {
        if let Some(embedded) = self.embedded.as_ref().filter(|s| s.is_available()) {
            embedded.submit(payload);
        } else if let Some(http) = &self.http {
            http.submit(payload);
        } else {
            warn!("No position sender available (neither embedded nor HTTP configured)");
        }
    }

    fn is_available(&self) -> bool {
        self.embedded.as_ref().is_some_and(|s| s.is_available()) || self.http.is_some()
    }
}
