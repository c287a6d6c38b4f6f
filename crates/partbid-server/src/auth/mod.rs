//! Session tokens for the `PartBid` API.
//!
//! Login issues a single HS256 access token; there are no
//! refresh tokens and nothing about a token is stored server-side. A token
//! only names its user: every request re-reads that user, so deactivation
//! and role changes apply on the next call, and logout merely records the
//! event.

pub mod claims;
pub mod jwt;

pub use claims::Claims;
pub use jwt::JwtManager;
