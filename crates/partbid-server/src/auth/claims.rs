//! JWT claims carried by `PartBid` session tokens.
//!
//! Only `sub` is trusted when serving a request; `username` and `role`
//! describe the user at login time and may be stale.

use partbid_core::models::{Id, Role};
use serde::{Deserialize, Serialize};

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// JWT ID (unique per token).
    pub jti: String,
    /// Subject (user ID as a decimal string).
    pub sub: String,
    pub username: String,
    /// Role at issue time. Informational; requests re-resolve the user.
    pub role: Role,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
    pub token_type: String,
}

impl Claims {
    pub fn is_access(&self) -> bool {
        self.token_type == "access"
    }

    /// The subject as a user id, if it parses.
    pub fn user_id(&self) -> Option<Id> {
        self.sub.parse().ok()
    }
}
