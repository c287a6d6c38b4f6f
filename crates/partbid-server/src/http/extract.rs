//! Request extractors: the authenticated caller and JSON/path/query wrappers
//! whose rejections use the API error body.

use axum::extract::{FromRequest, FromRequestParts, Path, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use partbid_core::Viewer;
use partbid_core::models::User;
use tracing::debug;

use super::AppState;
use super::error::ApiError;

/// JSON body extractor rejecting with [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path extractor rejecting with [`ApiError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Query string extractor rejecting with [`ApiError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// The caller behind a bearer token.
///
/// The token only names the user; the record is re-read on every request so
/// a deactivated account loses access immediately.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub viewer: Viewer,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::unauthenticated("Missing authorization header"))?;

        let claims = state.jwt.validate(token).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            ApiError::unauthenticated("Invalid token")
        })?;
        if !claims.is_access() {
            return Err(ApiError::unauthenticated("Not an access token"));
        }
        let user_id = claims
            .user_id()
            .ok_or_else(|| ApiError::unauthenticated("Invalid token subject"))?;

        let user = state
            .market
            .get_user(user_id)
            .await?
            .filter(|u| u.active)
            .ok_or_else(|| ApiError::unauthenticated("User not found or inactive"))?;
        let viewer = state.market.viewer(&user).await?;
        Ok(Self { user, viewer })
    }
}
