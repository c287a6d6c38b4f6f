//! User administration and supplier directory endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use partbid_core::models::{Id, Supplier, User};
use partbid_core::{Account, Registration};
use serde::Deserialize;

use super::AppState;
use super::error::ApiError;
use super::extract::{ApiJson, ApiPath, CurrentUser};

#[derive(Debug, Deserialize)]
pub struct ActiveRequest {
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: i32,
}

/// `GET /api/users`
pub async fn list_users(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.market.list_users(&caller.viewer).await?))
}

/// `POST /api/users`: admin-created account of any role.
pub async fn create_user(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiJson(registration): ApiJson<Registration>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let account = state
        .market
        .create_user(&caller.viewer, registration)
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// `PATCH /api/users/{id}/active`
pub async fn set_user_active(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiPath(user_id): ApiPath<Id>,
    ApiJson(request): ApiJson<ActiveRequest>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .market
        .set_user_active(&caller.viewer, user_id, request.active)
        .await?;
    Ok(Json(user))
}

/// `GET /api/suppliers`
pub async fn list_suppliers(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<Vec<Supplier>>, ApiError> {
    Ok(Json(state.market.list_suppliers(&caller.viewer).await?))
}

/// `GET /api/suppliers/{id}`
pub async fn get_supplier(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiPath(supplier_id): ApiPath<Id>,
) -> Result<Json<Supplier>, ApiError> {
    Ok(Json(
        state.market.get_supplier(&caller.viewer, supplier_id).await?,
    ))
}

/// `PATCH /api/suppliers/{id}/rating`
pub async fn rate_supplier(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiPath(supplier_id): ApiPath<Id>,
    ApiJson(request): ApiJson<RatingRequest>,
) -> Result<Json<Supplier>, ApiError> {
    let supplier = state
        .market
        .rate_supplier(&caller.viewer, supplier_id, request.rating)
        .await?;
    Ok(Json(supplier))
}
