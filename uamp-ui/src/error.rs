//! Error types for uamp-ui
//!
//! Gateway failures carry a structured kind so that the poll loop can tell
//! an unreachable gateway apart from an application-level failure.

use thiserror::Error;

/// Failure talking to the dispute gateway
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// `POST /submit-dispute` returned a non-2xx response
    #[error("submit-dispute failed: {status} {body}")]
    Submission { status: u16, body: String },

    /// `GET /status/{id}` returned a non-2xx response
    #[error("status failed: {status} {body}")]
    StatusFetch { status: u16, body: String },

    /// Connection refused, DNS failure, reset, or similar transport failure
    #[error("Network error: gateway unreachable ({0})")]
    Unreachable(String),

    /// Request did not complete in time
    #[error("Network error: request timed out ({0})")]
    Timeout(String),

    /// Response body could not be decoded
    #[error("Invalid gateway response: {0}")]
    Decode(String),

    /// Base URL cannot be used to build request URLs
    #[error("Invalid gateway URL: {0}")]
    InvalidUrl(String),

    /// HTTP client construction or other client-side failure
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl GatewayError {
    /// True when the failure indicates the gateway cannot be reached
    pub fn is_connectivity(&self) -> bool {
        matches!(self, GatewayError::Unreachable(_) | GatewayError::Timeout(_))
    }

    /// HTTP status of a rejected request, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            GatewayError::Submission { status, .. } | GatewayError::StatusFetch { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            GatewayError::Unreachable(err.to_string())
        } else if err.is_decode() || err.is_body() {
            GatewayError::Decode(err.to_string())
        } else if err.is_builder() {
            GatewayError::InvalidUrl(err.to_string())
        } else {
            GatewayError::Client(err.to_string())
        }
    }
}

/// Field-level form validation failure; no request is sent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("At least 2 parties required (got {found})")]
    TooFewParties { found: usize },

    #[error("Evidence CID is required")]
    EmptyCid,

    #[error("Invalid CID format. Please provide a valid IPFS CID")]
    InvalidCid,
}

impl ValidationError {
    /// Form field the error belongs to
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::TooFewParties { .. } => "parties",
            ValidationError::EmptyCid | ValidationError::InvalidCid => "cid",
        }
    }
}

/// Failure of a submission attempt
#[derive(Debug, Clone, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_classification() {
        assert!(GatewayError::Unreachable("refused".into()).is_connectivity());
        assert!(GatewayError::Timeout("5s".into()).is_connectivity());
        assert!(!GatewayError::Decode("eof".into()).is_connectivity());
        assert!(!GatewayError::StatusFetch { status: 503, body: String::new() }.is_connectivity());
        assert!(!GatewayError::Submission { status: 400, body: String::new() }.is_connectivity());
    }

    #[test]
    fn test_rejection_message_keeps_body_verbatim() {
        let err = GatewayError::Submission {
            status: 422,
            body: r#"{"detail":"cid not pinned"}"#.to_string(),
        };
        assert_eq!(
            err.to_string(),
            r#"submit-dispute failed: 422 {"detail":"cid not pinned"}"#
        );
        assert_eq!(err.status_code(), Some(422));
    }

    #[test]
    fn test_validation_error_fields() {
        assert_eq!(ValidationError::TooFewParties { found: 1 }.field(), "parties");
        assert_eq!(ValidationError::InvalidCid.field(), "cid");
    }
}
