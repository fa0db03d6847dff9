//! Shared test fixtures: an HTTP fake of the gateway and a scripted
//! in-memory gateway for timer-driven controller tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uamp_common::api::{
    Phase, Receipt, ReceiptHashes, StatusResponse, SubmitDisputeRequest, SubmitDisputeResponse,
};
use uamp_ui::{DisputeForm, DisputeGateway, GatewayError};
use uamp_common::api::Jurisdiction;

pub const SCENARIO_CID: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

pub fn valid_form() -> DisputeForm {
    DisputeForm::new("Alice Ltd,Bob Pty", Jurisdiction::NswAu, SCENARIO_CID)
}

pub fn receipt(id: &str, step: &str) -> Receipt {
    Receipt {
        receipt_id: id.to_string(),
        step: step.to_string(),
        hashes: ReceiptHashes {
            inputs_hash: format!("0xin{}", id),
            outputs_hash: format!("0xout{}", id),
        },
        ts: "2024-03-14T09:26:53Z".to_string(),
    }
}

pub fn status(dispute_id: &str, phase: Phase, receipts: Vec<Receipt>) -> StatusResponse {
    StatusResponse {
        dispute_id: dispute_id.to_string(),
        phase,
        receipts,
        anchor_tx: None,
        eps_budget: None,
    }
}

pub fn unreachable() -> GatewayError {
    GatewayError::Unreachable("connection refused".to_string())
}

// ========================================
// Scripted Gateway
// ========================================

/// In-memory gateway answering from queued results
///
/// Once the status script runs out every poll returns an `INTAKE` snapshot.
pub struct ScriptedGateway {
    submits: Mutex<VecDeque<Result<SubmitDisputeResponse, GatewayError>>>,
    statuses: Mutex<VecDeque<Result<StatusResponse, GatewayError>>>,
    submit_delay: Duration,
    submit_calls: AtomicUsize,
    status_calls: AtomicUsize,
    requested_ids: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            submits: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
            submit_delay: Duration::ZERO,
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            requested_ids: Mutex::new(Vec::new()),
        }
    }

    pub fn with_statuses(
        statuses: impl IntoIterator<Item = Result<StatusResponse, GatewayError>>,
    ) -> Self {
        let gateway = Self::new();
        gateway.statuses.lock().unwrap().extend(statuses);
        gateway
    }

    /// Every submission takes `delay` before answering
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    pub fn push_submit(&self, result: Result<SubmitDisputeResponse, GatewayError>) {
        self.submits.lock().unwrap().push_back(result);
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn requested_ids(&self) -> Vec<String> {
        self.requested_ids.lock().unwrap().clone()
    }
}

#[async_trait]
impl DisputeGateway for ScriptedGateway {
    fn base_url(&self) -> &str {
        "http://gateway.test"
    }

    async fn submit_dispute(
        &self,
        _request: &SubmitDisputeRequest,
    ) -> Result<SubmitDisputeResponse, GatewayError> {
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }
        self.submits.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(SubmitDisputeResponse {
                dispute_id: format!("disp_{}", n),
                anchor_uri: format!("ipfs://anchor/disp_{}", n),
            })
        })
    }

    async fn get_status(&self, dispute_id: &str) -> Result<StatusResponse, GatewayError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.requested_ids.lock().unwrap().push(dispute_id.to_string());
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(status(dispute_id, Phase::Intake, Vec::new())))
    }
}

// ========================================
// HTTP Fake Gateway
// ========================================

/// What the fake gateway saw, and how it should answer
#[derive(Clone)]
pub struct FakeGateway {
    pub submissions: Arc<Mutex<Vec<Value>>>,
    pub status_requests: Arc<Mutex<Vec<(String, Option<String>)>>>,
    pub phase: Arc<Mutex<Phase>>,
    pub health: Arc<Mutex<StatusCode>>,
}

impl FakeGateway {
    fn new() -> Self {
        Self {
            submissions: Arc::new(Mutex::new(Vec::new())),
            status_requests: Arc::new(Mutex::new(Vec::new())),
            phase: Arc::new(Mutex::new(Phase::Complete)),
            health: Arc::new(Mutex::new(StatusCode::OK)),
        }
    }

    pub fn set_phase(&self, phase: Phase) {
        *self.phase.lock().unwrap() = phase;
    }

    pub fn set_health(&self, status: StatusCode) {
        *self.health.lock().unwrap() = status;
    }

    pub fn status_ids(&self) -> Vec<String> {
        self.status_requests
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}

async fn submit_handler(State(fake): State<FakeGateway>, Json(body): Json<Value>) -> Response {
    let parties = body["parties"].as_array().map(|p| p.len()).unwrap_or(0);
    if parties < 2 {
        return (StatusCode::UNPROCESSABLE_ENTITY, "need at least two parties").into_response();
    }

    let mut submissions = fake.submissions.lock().unwrap();
    submissions.push(body);
    let id = format!("disp_{}", submissions.len());
    Json(SubmitDisputeResponse {
        anchor_uri: format!("ipfs://anchor/{}", id),
        dispute_id: id,
    })
    .into_response()
}

async fn status_handler(
    State(fake): State<FakeGateway>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let cache_control = headers
        .get("cache-control")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    fake.status_requests
        .lock()
        .unwrap()
        .push((id.clone(), cache_control));

    match id.as_str() {
        "missing" => (StatusCode::NOT_FOUND, "dispute not found").into_response(),
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "pipeline crashed").into_response(),
        "garbled" => (StatusCode::OK, "{not json").into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            (StatusCode::OK, "{}").into_response()
        }
        _ => {
            let phase = *fake.phase.lock().unwrap();
            let receipts = vec![receipt("r1", "INTAKE_V1"), receipt("r2", "SETTLEMENT_REACHED")];
            Json(status(&id, phase, receipts)).into_response()
        }
    }
}

async fn health_handler(State(fake): State<FakeGateway>) -> StatusCode {
    *fake.health.lock().unwrap()
}

/// Start the fake gateway on an ephemeral port; returns its base URL
pub async fn spawn_fake_gateway() -> (String, FakeGateway) {
    let fake = FakeGateway::new();
    let app = Router::new()
        .route("/submit-dispute", post(submit_handler))
        .route("/status/:id", get(status_handler))
        .route("/health", get(health_handler))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), fake)
}

/// Base URL of a port that refuses connections
pub async fn refused_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
