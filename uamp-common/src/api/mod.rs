//! Gateway API wire types
//!
//! Request and response bodies exchanged with the dispute resolution
//! gateway. Kept free of any HTTP client dependency so that both the
//! client and test fakes can share them.

pub mod types;

pub use types::{
    default_enc_meta, AnchorTx, EpsBudget, Jurisdiction, Phase, Receipt, ReceiptHashes,
    StatusResponse, SubmitDisputeRequest, SubmitDisputeResponse,
};
