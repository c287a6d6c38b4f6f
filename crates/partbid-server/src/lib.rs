//! `PartBid` Server Library
//!
//! HTTP surface of the supplier-auction service:
//! - JWT session tokens issued at login
//! - axum router mapping JSON requests onto `partbid_core::Marketplace`
//! - Error-to-status mapping shared by every handler

pub mod auth;
pub mod http;
