//! # UAMP Dispute Front End
//!
//! Terminal front end for submitting disputes to a resolution gateway and
//! following their processing timeline.
//!
//! - [`gateway`]: HTTP client for the gateway's submit and status endpoints
//! - [`controller`]: form validation, submission and the status poll loop
//! - [`probe`]: independent gateway reachability checks
//! - [`timeline`] / [`view`]: rendering of receipts and status panels

pub mod controller;
pub mod error;
pub mod gateway;
pub mod probe;
pub mod timeline;
pub mod view;

pub use controller::{
    ControllerPhase, ControllerState, DisputeForm, PollConfig, SubmissionController,
};
pub use error::{ControllerError, GatewayError, ValidationError};
pub use gateway::{DisputeGateway, GatewayClient};
pub use probe::{ConnectionProbe, Reachability};
