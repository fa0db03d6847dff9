//! # UAMP Common Library
//!
//! Shared code for the UAMP dispute front end including:
//! - Gateway wire types (submission, status, receipts)
//! - Content-identifier validation
//! - Gateway URL configuration loading and persistence
//! - Timestamp formatting

pub mod api;
pub mod cid;
pub mod config;
pub mod error;
pub mod time;

pub use cid::validate_cid;
pub use error::{Error, Result};
