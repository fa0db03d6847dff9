//! Gateway connection probe
//!
//! Periodically checks that the configured gateway answers on `/health`.
//! Runs independently of the submission controller and never touches its
//! state.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::GatewayError;

/// Time between background checks
pub const PROBE_INTERVAL: Duration = Duration::from_secs(30);

/// A check that takes longer than this counts as unreachable
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Result of the most recent reachability check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    /// No check has completed yet
    Unknown,
    Reachable,
    Unreachable,
}

/// Reachability checker for one gateway base URL
pub struct ConnectionProbe {
    http_client: reqwest::Client,
    health_url: String,
    interval: Duration,
    state: watch::Sender<Reachability>,
    retry: Notify,
}

impl ConnectionProbe {
    /// Probe with the default 30 s interval and 3 s timeout
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        Self::with_timing(base_url, PROBE_INTERVAL, PROBE_TIMEOUT)
    }

    pub fn with_timing(
        base_url: &str,
        interval: Duration,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        let (state, _) = watch::channel(Reachability::Unknown);

        Ok(Self {
            http_client,
            health_url: format!("{}/health", base_url.trim_end_matches('/')),
            interval,
            state,
            retry: Notify::new(),
        })
    }

    pub fn health_url(&self) -> &str {
        &self.health_url
    }

    /// Latest known reachability
    pub fn current(&self) -> Reachability {
        *self.state.borrow()
    }

    /// Receive every reachability update
    pub fn subscribe(&self) -> watch::Receiver<Reachability> {
        self.state.subscribe()
    }

    /// Run one check immediately and publish the result
    ///
    /// Any 2xx response counts as reachable.
    pub async fn check_now(&self) -> Reachability {
        let result = match self.http_client.get(&self.health_url).send().await {
            Ok(response) if response.status().is_success() => Reachability::Reachable,
            Ok(response) => {
                debug!(url = %self.health_url, status = %response.status(), "Health check rejected");
                Reachability::Unreachable
            }
            Err(e) => {
                debug!(url = %self.health_url, error = %e, "Health check failed");
                Reachability::Unreachable
            }
        };

        let previous = self.state.send_replace(result);
        if previous != result {
            match result {
                Reachability::Reachable => info!(url = %self.health_url, "Gateway reachable"),
                _ => warn!(url = %self.health_url, "Gateway unreachable"),
            }
        }

        result
    }

    /// Ask the background task to re-check now instead of at the next tick
    pub fn retry(&self) {
        self.retry.notify_one();
    }

    /// Check immediately, then on every interval, until cancelled
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = interval(self.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = timer.tick() => {}
                    _ = self.retry.notified() => {
                        debug!("Manual connection re-check requested");
                        timer.reset();
                    }
                }

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = self.check_now() => {}
                }
            }

            debug!(url = %self.health_url, "Connection probe stopped");
        })
    }
}
