//! Error types for `PartBid` core library.

use thiserror::Error;

use crate::store::StoreError;

/// Result type alias using `PartBid` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `PartBid` operations.
///
/// The first five variants are the business outcomes the HTTP layer maps to
/// status codes; the rest are infrastructure failures.
#[derive(Debug, Error)]
pub enum Error {
    /// Referenced entity id does not resolve.
    #[error("{0} not found")]
    NotFound(String),

    /// Caller's role or identity does not satisfy the access rule.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Operation is not valid for the entity's current status.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Input shape or constraint violation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Uniqueness violation.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unknown username or wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Backing store failure.
    #[error("Store error: {0}")]
    Store(String),

    /// Password hashing failed.
    #[error("Password hashing error: {0}")]
    Password(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn denied(why: impl Into<String>) -> Self {
        Self::PermissionDenied(why.into())
    }

    pub fn invalid_state(why: impl Into<String>) -> Self {
        Self::InvalidState(why.into())
    }

    pub fn validation(why: impl Into<String>) -> Self {
        Self::Validation(why.into())
    }

    /// Short machine-readable label for the error kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::PermissionDenied(_) => "permission_denied",
            Self::InvalidState(_) => "invalid_state",
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Store(_)
            | Self::Password(_)
            | Self::Config(_)
            | Self::Json(_)
            | Self::Io(_) => "internal",
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Conflict(what) => Self::Conflict(what),
            StoreError::StaleState(what) => Self::InvalidState(what),
            StoreError::NotPermitted(what) => Self::PermissionDenied(what),
            StoreError::Unavailable(what) => Self::Store(what),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_onto_business_kinds() {
        let err: Error = StoreError::StaleState("auction 1 is completed".into()).into();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(err.kind(), "invalid_state");

        let err: Error = StoreError::NotPermitted("supplier 2 is not invited".into()).into();
        assert!(matches!(err, Error::PermissionDenied(_)));

        let err: Error = StoreError::Unavailable("lock poisoned".into()).into();
        assert_eq!(err.kind(), "internal");
    }

    #[test]
    fn not_found_message_names_the_entity() {
        assert_eq!(Error::not_found("Auction 7").to_string(), "Auction 7 not found");
    }
}
