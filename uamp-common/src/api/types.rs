//! Gateway request/response types
//!
//! Field names follow the gateway's JSON contract exactly (snake_case,
//! upper-case phase codes).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::Error;

// ========================================
// Submission Types
// ========================================

/// Jurisdiction region codes accepted by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Jurisdiction {
    #[default]
    #[serde(rename = "NSW-AU")]
    NswAu,
    #[serde(rename = "VIC-AU")]
    VicAu,
    #[serde(rename = "QLD-AU")]
    QldAu,
    #[serde(rename = "WA-AU")]
    WaAu,
    #[serde(rename = "SA-AU")]
    SaAu,
    #[serde(rename = "TAS-AU")]
    TasAu,
    #[serde(rename = "ACT-AU")]
    ActAu,
    #[serde(rename = "NT-AU")]
    NtAu,
}

impl Jurisdiction {
    /// All selectable jurisdictions, in display order
    pub const ALL: [Jurisdiction; 8] = [
        Jurisdiction::NswAu,
        Jurisdiction::VicAu,
        Jurisdiction::QldAu,
        Jurisdiction::WaAu,
        Jurisdiction::SaAu,
        Jurisdiction::TasAu,
        Jurisdiction::ActAu,
        Jurisdiction::NtAu,
    ];

    /// Wire code, e.g. `NSW-AU`
    pub fn code(&self) -> &'static str {
        match self {
            Jurisdiction::NswAu => "NSW-AU",
            Jurisdiction::VicAu => "VIC-AU",
            Jurisdiction::QldAu => "QLD-AU",
            Jurisdiction::WaAu => "WA-AU",
            Jurisdiction::SaAu => "SA-AU",
            Jurisdiction::TasAu => "TAS-AU",
            Jurisdiction::ActAu => "ACT-AU",
            Jurisdiction::NtAu => "NT-AU",
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Jurisdiction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Jurisdiction::ALL
            .into_iter()
            .find(|j| j.code().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let known: Vec<&str> = Jurisdiction::ALL.iter().map(|j| j.code()).collect();
                Error::InvalidInput(format!(
                    "unknown jurisdiction '{}' (expected one of: {})",
                    wanted,
                    known.join(", ")
                ))
            })
    }
}

/// Body of `POST /submit-dispute`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitDisputeRequest {
    /// At least two non-empty party names
    pub parties: Vec<String>,
    pub jurisdiction: Jurisdiction,
    /// Evidence content identifier (trimmed)
    pub cid: String,
    /// Opaque encryption metadata forwarded to the gateway
    pub enc_meta: Map<String, Value>,
}

/// Response of a successful submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitDisputeResponse {
    pub dispute_id: String,
    pub anchor_uri: String,
}

/// Encryption metadata sent when the user supplies none
///
/// # Examples
///
/// ```
/// use uamp_common::api::types::default_enc_meta;
///
/// let meta = default_enc_meta("t_demo");
/// assert_eq!(meta["embedding_dim"], 768);
/// assert_eq!(meta["tenant_id"], "t_demo");
/// ```
pub fn default_enc_meta(tenant_id: &str) -> Map<String, Value> {
    let mut meta = Map::new();
    meta.insert("embedding_dim".to_string(), Value::from(768));
    meta.insert("tenant_id".to_string(), Value::from(tenant_id));
    meta
}

// ========================================
// Status Types
// ========================================

/// Coarse lifecycle stage reported by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Intake,
    Searching,
    Negotiating,
    Complete,
    Error,
}

impl Phase {
    /// Polling stops once one of these phases is reported
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Complete | Phase::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Intake => "INTAKE",
            Phase::Searching => "SEARCHING",
            Phase::Negotiating => "NEGOTIATING",
            Phase::Complete => "COMPLETE",
            Phase::Error => "ERROR",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input/output hash commitments of a pipeline step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptHashes {
    pub inputs_hash: String,
    pub outputs_hash: String,
}

/// Record of one completed pipeline step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub receipt_id: String,
    /// Pipeline stage tag, e.g. `SEARCH_COMPLETE`
    pub step: String,
    pub hashes: ReceiptHashes,
    pub ts: String,
}

/// Ledger transaction anchoring the dispute outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorTx {
    pub network: String,
    pub tx: String,
    pub block: u64,
}

impl AnchorTx {
    /// First ten characters of the transaction hash
    pub fn short_tx(&self) -> &str {
        match self.tx.char_indices().nth(10) {
            Some((idx, _)) => &self.tx[..idx],
            None => &self.tx,
        }
    }
}

/// Privacy budget usage reported by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpsBudget {
    pub tenant_id: String,
    pub spent: f64,
    pub budget: f64,
}

impl EpsBudget {
    /// Fraction of the budget spent, clamped to `0.0..=1.0`
    ///
    /// A non-positive budget reads as fully spent.
    pub fn usage_ratio(&self) -> f64 {
        if self.budget <= 0.0 {
            return 1.0;
        }
        (self.spent / self.budget).clamp(0.0, 1.0)
    }
}

/// Body of `GET /status/{dispute_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub dispute_id: String,
    pub phase: Phase,
    /// Chronological, as returned by the gateway
    #[serde(default)]
    pub receipts: Vec<Receipt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_tx: Option<AnchorTx>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eps_budget: Option<EpsBudget>,
}

// ========================================
// Tests
// ========================================
