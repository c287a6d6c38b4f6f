//! Sign-up, login and session endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use partbid_core::{Account, Registration};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AppState;
use super::error::ApiError;
use super::extract::{ApiJson, CurrentUser};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Token lifetime in seconds.
    pub expires_in: i64,
    pub account: Account,
}

/// `POST /api/auth/register`: supplier self sign-up.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(registration): ApiJson<Registration>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let account = state.market.sign_up(registration).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .market
        .authenticate(&request.username, &request.password)
        .await?;
    let (access_token, expires_in) = state.jwt.issue_access_token(&user)?;
    let supplier = state.market.get_supplier_by_user_id(user.id).await?;
    info!(user_id = user.id, "Issued access token");
    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer",
        expires_in,
        account: Account { user, supplier },
    }))
}

/// `POST /api/auth/logout`: tokens are stateless, so this only records the
/// event.
pub async fn logout(State(state): State<AppState>, caller: CurrentUser) -> StatusCode {
    state.market.logout(&caller.viewer).await;
    StatusCode::NO_CONTENT
}

/// `GET /api/auth/me`
pub async fn me(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<Account>, ApiError> {
    let supplier = match caller.viewer.supplier_id {
        Some(_) => state.market.get_supplier_by_user_id(caller.user.id).await?,
        None => None,
    };
    Ok(Json(Account {
        user: caller.user,
        supplier,
    }))
}
