//! Dispute gateway access
//!
//! The controller talks to the gateway through [`DisputeGateway`] so that
//! the HTTP client can be swapped for an in-memory fake in tests.

use async_trait::async_trait;
use uamp_common::api::{StatusResponse, SubmitDisputeRequest, SubmitDisputeResponse};

use crate::error::GatewayError;

pub mod client;

pub use client::{GatewayClient, DEFAULT_REQUEST_TIMEOUT};

/// Gateway operations used by the submission controller
///
/// Both calls are single-shot: retry policy belongs to the caller.
#[async_trait]
pub trait DisputeGateway: Send + Sync {
    /// Base URL requests are issued against
    fn base_url(&self) -> &str;

    /// Submit a new dispute
    async fn submit_dispute(
        &self,
        request: &SubmitDisputeRequest,
    ) -> Result<SubmitDisputeResponse, GatewayError>;

    /// Fetch the current status snapshot of a dispute
    async fn get_status(&self, dispute_id: &str) -> Result<StatusResponse, GatewayError>;
}
