//! TelemetryAgent – wires config, provider and sink together and drives the
//! delivery scheduler until shutdown.

use crate::config::RuntimeConfig;
use crate::embedded::{EmbeddedServer, NativeBridge};
use crate::provider::PlayerStateProvider;
use crate::scheduler::{DeliveryScheduler, SchedulerStats};
use crate::transport::{HttpTransport, PositionRouter, PositionSink};
use anyhow::Result;
use log::{error, info, warn};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::Instrument;

pub struct TelemetryAgent {
    config: Arc<RuntimeConfig>,
    provider: Arc<dyn PlayerStateProvider>,
    bridge: Option<(Arc<dyn NativeBridge>, PathBuf)>,
}

impl TelemetryAgent {
    pub fn new(config: Arc<RuntimeConfig>, provider: Arc<dyn PlayerStateProvider>) -> Self {
        Self {
            config,
            provider,
            bridge: None,
        }
    }

    /// Native library and data directory for `use-embedded-server`.
    pub fn with_bridge(mut self, bridge: Arc<dyn NativeBridge>, data_dir: impl Into<PathBuf>) -> Self {
        self.bridge = Some((bridge, data_dir.into()));
        self
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> Result<SchedulerStats> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<SchedulerStats>
    where
        F: Future<Output = ()>,
    {
        // An invalid config leaves the adapter permanently idle, not crashed.
        if let Err(e) = self.config.validate() {
            error!("Position telemetry disabled: {}", e);
            return Ok(SchedulerStats::default());
        }

        // -----------------------------------------------------------------------
        // Sink selection
        // -----------------------------------------------------------------------

        let embedded = if self.config.use_embedded_server {
            match self.start_embedded() {
                Some(server) => Some(server),
                None => {
                    error!("Embedded server unavailable; position telemetry disabled");
                    return Ok(SchedulerStats::default());
                }
            }
        } else {
            None
        };

        let mut router = PositionRouter::new();
        if let Some(server) = &embedded {
            router = router.with_embedded(Arc::clone(server) as Arc<dyn PositionSink>);
        } else {
            let http = HttpTransport::from_config(&self.config)?;
            info!("Sending positions to {}", http.url());
            router = router.with_http(Arc::new(http));
        }

        // -----------------------------------------------------------------------
        // Spawn tick loop
        // -----------------------------------------------------------------------

        info!(
            "TelemetryAgent running (game={}, minimum_players={}, poll={}ms, debug={})",
            self.config.game.as_str(),
            self.config.minimum_players,
            self.config.poll_interval_ms,
            self.config.debug,
        );

        let span = tracing::info_span!("telemetry", game = self.config.game.as_str());
        let scheduler = DeliveryScheduler::new(
            Arc::clone(&self.config),
            Arc::clone(&self.provider),
            Arc::new(router),
        );
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let mut tick_handle = tokio::spawn(
            scheduler
                .run_until(async {
                    let _ = stop_rx.await;
                })
                .instrument(span),
        );

        // -----------------------------------------------------------------------
        // Wait for shutdown signal
        // -----------------------------------------------------------------------

        let stats = tokio::select! {
            joined = &mut tick_handle => {
                error!("Delivery scheduler exited unexpectedly");
                joined?
            }
            _ = shutdown => {
                info!("TelemetryAgent shutting down");
                let _ = stop_tx.send(());
                tick_handle.await?
            }
        };

        if let Some(server) = embedded {
            tokio::task::spawn_blocking(move || server.stop()).await?;
        }

        info!(
            "TelemetryAgent stopped ({} ticks, {} dispatched)",
            stats.total_ticks, stats.dispatched
        );
        Ok(stats)
    }

    fn start_embedded(&self) -> Option<Arc<EmbeddedServer>> {
        let Some((bridge, data_dir)) = &self.bridge else {
            error!("Embedded server mode is enabled but no native library is available");
            return None;
        };
        match EmbeddedServer::start(Arc::clone(bridge), &self.config, data_dir) {
            Ok(server) => Some(Arc::new(server)),
            Err(e) => {
                error!("Failed to start embedded server: {}", e);
                None
            }
        }
    }
}
