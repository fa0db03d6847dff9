//! HTTP client for the dispute gateway
//!
//! Endpoints:
//! - `POST {base}/submit-dispute` with a JSON body
//! - `GET {base}/status/{dispute_id}`, never served from a cache

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, info};
use uamp_common::api::{StatusResponse, SubmitDisputeRequest, SubmitDisputeResponse};

use super::DisputeGateway;
use crate::error::GatewayError;

/// Per-request timeout for gateway calls
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("uamp-ui/", env!("CARGO_PKG_VERSION"));

/// Dispute gateway API client
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http_client: reqwest::Client,
    base_url: Url,
    base_display: String,
}

impl GatewayClient {
    /// Create a client for the given base URL
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with a custom per-request timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let base_display = base_url.trim_end_matches('/').to_string();
        let parsed = Url::parse(&base_display)
            .map_err(|e| GatewayError::InvalidUrl(format!("{}: {}", base_display, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl(base_display));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: parsed,
            base_display,
        })
    }

    /// Build `{base}/{segments...}`, escaping each segment
    ///
    /// A dispute id containing `/`, `?` or `#` stays a single path segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| GatewayError::InvalidUrl(self.base_display.clone()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    async fn error_body(response: reqwest::Response) -> String {
        response.text().await.unwrap_or_default()
    }
}

#[async_trait]
impl DisputeGateway for GatewayClient {
    fn base_url(&self) -> &str {
        &self.base_display
    }

    async fn submit_dispute(
        &self,
        request: &SubmitDisputeRequest,
    ) -> Result<SubmitDisputeResponse, GatewayError> {
        let url = self.endpoint(&["submit-dispute"])?;

        debug!(url = %url, parties = request.parties.len(), jurisdiction = %request.jurisdiction,
            "Submitting dispute");

        let response = self.http_client.post(url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            return Err(GatewayError::Submission {
                status: status.as_u16(),
                body,
            });
        }

        let accepted: SubmitDisputeResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        info!(dispute_id = %accepted.dispute_id, anchor_uri = %accepted.anchor_uri,
            "Dispute accepted by gateway");

        Ok(accepted)
    }

    async fn get_status(&self, dispute_id: &str) -> Result<StatusResponse, GatewayError> {
        let url = self.endpoint(&["status", dispute_id])?;

        debug!(dispute_id = %dispute_id, url = %url, "Fetching dispute status");

        let response = self
            .http_client
            .get(url)
            .header(CACHE_CONTROL, "no-cache, no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            return Err(GatewayError::StatusFetch {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = GatewayClient::new("http://localhost:8000/");
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        assert!(matches!(
            GatewayClient::new("localhost"),
            Err(GatewayError::InvalidUrl(_))
        ));
        assert!(matches!(
            GatewayClient::new("mailto:ops@example.com"),
            Err(GatewayError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_status_endpoint_escapes_dispute_id() {
        let client = GatewayClient::new("http://localhost:8000").unwrap();
        let url = client.endpoint(&["status", "case/7?x=1#frag"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/status/case%2F7%3Fx=1%23frag"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = GatewayClient::new("https://gw.example.com/dalrn/").unwrap();
        let url = client.endpoint(&["submit-dispute"]).unwrap();
        assert_eq!(url.as_str(), "https://gw.example.com/dalrn/submit-dispute");
    }
}
