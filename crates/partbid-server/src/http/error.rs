//! Mapping of core errors onto HTTP responses.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Error returned by every handler and extractor.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] partbid_core::Error),

    /// Missing, malformed or expired bearer token, or a token whose user is
    /// gone or deactivated.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Request body, path or query did not parse.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// Wire shape of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn unauthenticated(why: impl Into<String>) -> Self {
        Self::Unauthenticated(why.into())
    }

    pub const fn status(&self) -> StatusCode {
        use partbid_core::Error as E;
        match self {
            Self::Core(e) => match e {
                E::NotFound(_) => StatusCode::NOT_FOUND,
                E::PermissionDenied(_) => StatusCode::FORBIDDEN,
                E::InvalidState(_) | E::Conflict(_) => StatusCode::CONFLICT,
                E::Validation(_) => StatusCode::BAD_REQUEST,
                E::InvalidCredentials => StatusCode::UNAUTHORIZED,
                E::Store(_) | E::Password(_) | E::Config(_) | E::Json(_) | E::Io(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Core(e) => e.kind(),
            Self::Unauthenticated(_) => "unauthenticated",
            Self::BadRequest(_) => "validation",
            Self::Token(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorBody {
            error: self.kind(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use partbid_core::Error;

    #[test]
    fn business_errors_map_to_client_statuses() {
        let cases = [
            (Error::not_found("Auction 1"), StatusCode::NOT_FOUND),
            (Error::denied("buyers only"), StatusCode::FORBIDDEN),
            (Error::invalid_state("completed"), StatusCode::CONFLICT),
            (Error::Conflict("username".into()), StatusCode::CONFLICT),
            (Error::validation("title"), StatusCode::BAD_REQUEST),
            (Error::InvalidCredentials, StatusCode::UNAUTHORIZED),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let response = ApiError::from(Error::Store("disk on fire".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "internal");
        assert_eq!(json["message"], "Internal server error");
    }

    #[test]
    fn unauthenticated_is_401() {
        let err = ApiError::unauthenticated("Missing authorization header");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.kind(), "unauthenticated");
    }
}
