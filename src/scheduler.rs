//! DeliveryScheduler: one collect → build → submit cycle per tick.

use crate::config::RuntimeConfig;
use crate::protocol::Payload;
use crate::provider::PlayerStateProvider;
use crate::transport::PositionSink;
use log::{debug, trace, warn};
use serde::Serialize;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;

// ---------------------------------------------------------------------------
// Tick result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchedulerState {
    Idle,
    /// Only observable from inside a tick; delivery is never awaited.
    Dispatching,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    ConfigurationInvalid,
    BelowThreshold { players: usize, minimum: usize },
}

/// What a single [`DeliveryScheduler::tick`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A payload was handed to the sink.
    Dispatched { players: usize },
    Skipped(SkipReason),
    /// Collection failed or panicked; nothing was sent this tick.
    Aborted(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub total_ticks: u64,
    pub dispatched: u64,
    pub skipped_below_threshold: u64,
    pub skipped_invalid_config: u64,
    pub aborted: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct DeliveryScheduler {
    config: Arc<RuntimeConfig>,
    provider: Arc<dyn PlayerStateProvider>,
    sink: Arc<dyn PositionSink>,
    state: SchedulerState,
    stats: SchedulerStats,
}

impl DeliveryScheduler {
    pub fn new(
        config: Arc<RuntimeConfig>,
        provider: Arc<dyn PlayerStateProvider>,
        sink: Arc<dyn PositionSink>,
    ) -> Self {
        Self {
            config,
            provider,
            sink,
            state: SchedulerState::Idle,
            stats: SchedulerStats::default(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Run one cycle. Never blocks on the network and never panics.
    pub fn tick(&mut self) -> TickOutcome {
        self.stats.total_ticks += 1;

        // `debug` only relaxes the player threshold, never validity.
        if !self.config.is_valid() {
            trace!("Skipping tick: configuration invalid");
            self.stats.skipped_invalid_config += 1;
            return TickOutcome::Skipped(SkipReason::ConfigurationInvalid);
        }

        let payload = match self.build_payload() {
            Ok(payload) => payload,
            Err(reason) => {
                warn!("Position tick aborted: {}", reason);
                self.stats.aborted += 1;
                return TickOutcome::Aborted(reason);
            }
        };

        let players = payload.len();
        let minimum = self.config.minimum_players;
        if players < minimum && !self.config.debug {
            trace!("Skipping tick: {} players online, need {}", players, minimum);
            self.stats.skipped_below_threshold += 1;
            return TickOutcome::Skipped(SkipReason::BelowThreshold { players, minimum });
        }

        self.state = SchedulerState::Dispatching;
        self.sink.submit(payload);
        self.state = SchedulerState::Idle;

        self.stats.dispatched += 1;
        TickOutcome::Dispatched { players }
    }

    fn build_payload(&self) -> Result<Payload, String> {
        let provider = &self.provider;
        let collected = catch_unwind(AssertUnwindSafe(|| {
            provider
                .collect()
                .map(|records| Payload::build(provider.game(), records))
        }));

        match collected {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(e)) => Err(e.to_string()),
            Err(panic) => Err(format!("collection panicked: {}", panic_message(panic.as_ref()))),
        }
    }

    /// Tick every `poll_interval` until `shutdown` resolves. Late ticks are
    /// skipped, not bunched. Sends already in flight are left to finish.
    pub async fn run_until<F>(mut self, shutdown: F) -> SchedulerStats
    where
        F: Future<Output = ()>,
    {
        let mut timer = tokio::time::interval(self.config.poll_interval());
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = timer.tick() => {
                    if let TickOutcome::Dispatched { players } = self.tick() {
                        trace!("Dispatched {} players", players);
                    }
                }
            }
        }

        debug!("Delivery scheduler stopped: {:?}", self.stats);
        self.stats
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
