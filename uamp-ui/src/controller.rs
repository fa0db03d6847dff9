//! Submission and status polling controller
//!
//! Drives a dispute through `Idle → Validating → Submitting → Polling` and
//! on to one of the terminal phases. Every change is published as a
//! [`ControllerState`] snapshot on a `watch` channel for the view to render.
//!
//! Polling runs on a background task with a fixed interval. The first poll
//! fires immediately after a successful submission. Only one status request
//! is in flight at a time, and every state write is tagged with the session
//! that produced it, so a superseded or cancelled loop can never overwrite
//! newer state.

use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uamp_common::api::{
    default_enc_meta, Jurisdiction, Phase, StatusResponse, SubmitDisputeRequest,
    SubmitDisputeResponse,
};
use uamp_common::validate_cid;

use crate::error::{ControllerError, GatewayError, ValidationError};
use crate::gateway::DisputeGateway;

/// Time between status polls
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Consecutive connectivity failures tolerated before giving up
pub const MAX_NETWORK_RETRIES: u32 = 5;

/// Tenant used in the default encryption metadata
pub const DEFAULT_TENANT: &str = "t_demo";

// ========================================
// Form
// ========================================

/// User input for a dispute submission
#[derive(Debug, Clone, PartialEq)]
pub struct DisputeForm {
    /// Comma-separated party names
    pub parties: String,
    pub jurisdiction: Jurisdiction,
    pub cid: String,
    pub enc_meta: Map<String, Value>,
}

impl DisputeForm {
    /// Form with the default encryption metadata
    pub fn new(parties: impl Into<String>, jurisdiction: Jurisdiction, cid: impl Into<String>) -> Self {
        Self {
            parties: parties.into(),
            jurisdiction,
            cid: cid.into(),
            enc_meta: default_enc_meta(DEFAULT_TENANT),
        }
    }

    /// Replace the encryption metadata
    pub fn with_enc_meta(mut self, enc_meta: Map<String, Value>) -> Self {
        self.enc_meta = enc_meta;
        self
    }

    /// Trimmed, non-empty party names in input order
    pub fn party_list(&self) -> Vec<String> {
        self.parties
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect()
    }

    /// Check the form and compose the gateway request
    pub fn validate(&self) -> Result<SubmitDisputeRequest, ValidationError> {
        let parties = self.party_list();
        if parties.len() < 2 {
            return Err(ValidationError::TooFewParties {
                found: parties.len(),
            });
        }

        let cid = self.cid.trim();
        if cid.is_empty() {
            return Err(ValidationError::EmptyCid);
        }
        if !validate_cid(cid) {
            return Err(ValidationError::InvalidCid);
        }

        Ok(SubmitDisputeRequest {
            parties,
            jurisdiction: self.jurisdiction,
            cid: cid.to_string(),
            enc_meta: self.enc_meta.clone(),
        })
    }
}

// ========================================
// State
// ========================================

/// Phase of the submission flow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ControllerPhase {
    #[default]
    Idle,
    Validating,
    Submitting,
    Polling,
    /// Gateway reported `COMPLETE`
    Complete,
    /// Gateway reported `ERROR`
    Errored,
    /// Too many consecutive connectivity failures
    ConnectionLost,
}

impl ControllerPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ControllerPhase::Complete | ControllerPhase::Errored | ControllerPhase::ConnectionLost
        )
    }
}

/// Snapshot of everything the view renders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerState {
    pub phase: ControllerPhase,
    pub dispute_id: Option<String>,
    pub anchor_uri: Option<String>,
    /// Latest status, replaced wholesale on every successful poll
    pub status: Option<StatusResponse>,
    /// Form or submission error banner
    pub error: Option<String>,
    /// Connectivity warning, or the final connection-lost message
    pub network_error: Option<String>,
    /// Consecutive connectivity failures of the current poll loop
    pub network_failures: u32,
    /// Status requests issued for the current dispute
    pub polls_issued: u64,
    /// Increments each time a new dispute starts being tracked
    pub session: u64,
}

/// Polling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Polling stops once failures exceed this count
    pub max_network_retries: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            max_network_retries: MAX_NETWORK_RETRIES,
        }
    }
}

// ========================================
// Controller
// ========================================

/// Owns form submission and the status poll loop for one view
pub struct SubmissionController<G> {
    gateway: Arc<G>,
    config: PollConfig,
    state: Arc<watch::Sender<ControllerState>>,
    active: Mutex<Option<CancellationToken>>,
}

impl<G: DisputeGateway + 'static> SubmissionController<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self::with_config(gateway, PollConfig::default())
    }

    pub fn with_config(gateway: Arc<G>, config: PollConfig) -> Self {
        let (state, _) = watch::channel(ControllerState::default());
        Self {
            gateway,
            config,
            state: Arc::new(state),
            active: Mutex::new(None),
        }
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }

    /// Current state snapshot
    pub fn state(&self) -> ControllerState {
        self.state.borrow().clone()
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<ControllerState> {
        self.state.subscribe()
    }

    /// Validate and submit a dispute, then start polling its status
    ///
    /// A validation failure never reaches the network and leaves any
    /// previously tracked dispute untouched. Once validation passes the new
    /// submission supersedes the previous dispute. If `cancel` is called
    /// while the request is in flight, the accepted dispute is returned but
    /// never polled.
    pub async fn submit(&self, form: &DisputeForm) -> Result<SubmitDisputeResponse, ControllerError> {
        let previous_phase = self.state.borrow().phase;
        self.state.send_modify(|s| {
            s.phase = ControllerPhase::Validating;
            s.error = None;
        });

        let request = match form.validate() {
            Ok(request) => request,
            Err(e) => {
                debug!(field = e.field(), error = %e, "Dispute form rejected");
                self.state.send_modify(|s| {
                    s.phase = previous_phase;
                    s.error = Some(e.to_string());
                });
                return Err(e.into());
            }
        };

        let cancel = self.begin_session();
        let mut session = 0;
        self.state.send_modify(|s| {
            s.phase = ControllerPhase::Submitting;
            s.session += 1;
            session = s.session;
        });

        info!(parties = request.parties.len(), jurisdiction = %request.jurisdiction,
            gateway = %self.gateway.base_url(), "Submitting dispute");

        match self.gateway.submit_dispute(&request).await {
            Ok(response) => {
                if cancel.is_cancelled() {
                    info!(dispute_id = %response.dispute_id,
                        "Dispute accepted after cancellation; not polling");
                } else {
                    self.start_polling(
                        response.dispute_id.clone(),
                        Some(response.anchor_uri.clone()),
                        cancel,
                    );
                }
                Ok(response)
            }
            Err(e) => {
                warn!(error = %e, "Dispute submission failed");
                if !cancel.is_cancelled() {
                    update_session(&self.state, session, |s| {
                        *s = ControllerState {
                            error: Some(e.to_string()),
                            session: s.session,
                            ..ControllerState::default()
                        };
                    });
                }
                Err(e.into())
            }
        }
    }

    /// Start polling an already-accepted dispute
    ///
    /// Any previous poll loop is cancelled first. The first status request
    /// is issued immediately.
    pub fn track(&self, dispute_id: String, anchor_uri: Option<String>) {
        let cancel = self.begin_session();
        self.start_polling(dispute_id, anchor_uri, cancel);
    }

    /// Stop polling immediately; no further status request is issued
    ///
    /// Also abandons a submission in flight: its dispute will not be polled.
    pub fn cancel(&self) {
        if self.stop_active_loop() {
            let session = self.state.borrow().session;
            update_session(&self.state, session, |s| {
                if matches!(
                    s.phase,
                    ControllerPhase::Validating | ControllerPhase::Submitting | ControllerPhase::Polling
                ) {
                    s.phase = ControllerPhase::Idle;
                }
            });
            info!("Status polling cancelled");
        }
    }

    /// Wait until the controller reaches a terminal phase or goes idle,
    /// returning the final state
    ///
    /// Resolves at once when nothing has been submitted yet.
    pub async fn wait_until_settled(&self) -> ControllerState {
        let mut rx = self.state.subscribe();
        let settled = rx
            .wait_for(|s| s.phase.is_terminal() || s.phase == ControllerPhase::Idle)
            .await
            .map(|s| s.clone());
        match settled {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }

    pub fn dismiss_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    pub fn dismiss_network_error(&self) {
        self.state.send_if_modified(|s| s.network_error.take().is_some());
    }

    /// Cancel any previous session and install a fresh token for the next one
    fn begin_session(&self) -> CancellationToken {
        self.stop_active_loop();
        let cancel = CancellationToken::new();
        if let Ok(mut active) = self.active.lock() {
            *active = Some(cancel.clone());
        }
        cancel
    }

    fn start_polling(&self, dispute_id: String, anchor_uri: Option<String>, cancel: CancellationToken) {
        let mut session = 0;
        let started = self.state.send_if_modified(|s| {
            if cancel.is_cancelled() {
                return false;
            }
            session = s.session + 1;
            *s = ControllerState {
                phase: ControllerPhase::Polling,
                dispute_id: Some(dispute_id.clone()),
                anchor_uri,
                session,
                ..ControllerState::default()
            };
            true
        });
        if !started {
            debug!(dispute_id = %dispute_id, "Session cancelled before polling started");
            return;
        }

        info!(dispute_id = %dispute_id, interval = ?self.config.interval, "Polling dispute status");

        let poller = StatusPoller {
            gateway: Arc::clone(&self.gateway),
            config: self.config,
            state: Arc::clone(&self.state),
            dispute_id,
            session,
        };
        tokio::spawn(poller.run(cancel));
    }

    fn stop_active_loop(&self) -> bool {
        let token = match self.active.lock() {
            Ok(mut active) => active.take(),
            Err(_) => None,
        };
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

impl<G> Drop for SubmissionController<G> {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            if let Some(token) = active.take() {
                token.cancel();
            }
        }
    }
}

/// Apply `f` only if `session` is still the current one
fn update_session(
    state: &watch::Sender<ControllerState>,
    session: u64,
    f: impl FnOnce(&mut ControllerState),
) -> bool {
    state.send_if_modified(|s| {
        if s.session != session {
            return false;
        }
        f(s);
        true
    })
}

// ========================================
// Poll Loop
// ========================================

struct StatusPoller<G> {
    gateway: Arc<G>,
    config: PollConfig,
    state: Arc<watch::Sender<ControllerState>>,
    dispute_id: String,
    session: u64,
}

impl<G: DisputeGateway> StatusPoller<G> {
    async fn run(self, cancel: CancellationToken) {
        let mut timer = interval(self.config.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures: u32 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {}
            }

            if !update_session(&self.state, self.session, |s| s.polls_issued += 1) {
                break;
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.gateway.get_status(&self.dispute_id) => result,
            };

            let keep_polling = match result {
                Ok(snapshot) => {
                    failures = 0;
                    self.apply_snapshot(snapshot)
                }
                Err(e) if e.is_connectivity() => {
                    failures += 1;
                    self.record_network_failure(&e, failures)
                }
                Err(e) => {
                    warn!(dispute_id = %self.dispute_id, error = %e,
                        "Status fetch failed; retrying on next tick");
                    true
                }
            };

            if !keep_polling {
                break;
            }
        }

        debug!(dispute_id = %self.dispute_id, session = self.session, "Poll loop stopped");
    }

    /// Returns whether polling should continue
    fn apply_snapshot(&self, snapshot: StatusResponse) -> bool {
        let terminal = match snapshot.phase {
            Phase::Complete => Some(ControllerPhase::Complete),
            Phase::Error => Some(ControllerPhase::Errored),
            _ => None,
        };

        debug!(dispute_id = %self.dispute_id, phase = %snapshot.phase,
            receipts = snapshot.receipts.len(), "Status updated");

        let applied = update_session(&self.state, self.session, |s| {
            s.status = Some(snapshot);
            s.network_error = None;
            s.network_failures = 0;
            if let Some(phase) = terminal {
                s.phase = phase;
            }
        });

        if let Some(phase) = terminal {
            info!(dispute_id = %self.dispute_id, phase = ?phase, "Dispute reached terminal phase");
            return false;
        }
        applied
    }

    /// Returns whether polling should continue
    fn record_network_failure(&self, error: &GatewayError, failures: u32) -> bool {
        if failures > self.config.max_network_retries {
            warn!(dispute_id = %self.dispute_id, failures, error = %error,
                "Giving up on status polling: gateway unreachable");
            let message = format!(
                "Connection lost. Please check if the gateway at {} is running.",
                self.gateway.base_url()
            );
            update_session(&self.state, self.session, |s| {
                s.phase = ControllerPhase::ConnectionLost;
                s.network_failures = failures;
                s.network_error = Some(message);
            });
            return false;
        }

        warn!(dispute_id = %self.dispute_id, failures, error = %error,
            "Gateway unreachable; retrying");
        update_session(&self.state, self.session, |s| {
            s.network_failures = failures;
            s.network_error = Some(format!("{}. Retrying...", error));
        })
    }
}
