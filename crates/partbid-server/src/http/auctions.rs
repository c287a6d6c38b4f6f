//! Auction, invitation and bid endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use partbid_core::models::{
    Auction, AuctionBundle, AuctionPatch, AuctionStatus, Bid, BidWithItems, Id, Invitation,
};
use partbid_core::{AuctionDetail, AuctionRequest, BidDecision, BidSubmission};
use serde::Deserialize;

use super::AppState;
use super::error::ApiError;
use super::extract::{ApiJson, ApiPath, ApiQuery, CurrentUser};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub supplier_id: Id,
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub accept: bool,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub status: BidDecision,
}

/// `GET /api/auctions?status=`
pub async fn list_auctions(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<Auction>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<AuctionStatus>)
        .transpose()?;
    Ok(Json(state.market.list_auctions(&caller.viewer, status).await?))
}

/// `POST /api/auctions`
pub async fn create_auction(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiJson(request): ApiJson<AuctionRequest>,
) -> Result<(StatusCode, Json<AuctionBundle>), ApiError> {
    let bundle = state.market.create_auction(&caller.viewer, request).await?;
    Ok((StatusCode::CREATED, Json(bundle)))
}

/// `GET /api/auctions/{id}`
pub async fn get_auction(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiPath(auction_id): ApiPath<Id>,
) -> Result<Json<AuctionDetail>, ApiError> {
    Ok(Json(
        state
            .market
            .get_auction_detail(&caller.viewer, auction_id)
            .await?,
    ))
}

/// `PATCH /api/auctions/{id}`: descriptive fields only.
pub async fn update_auction(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiPath(auction_id): ApiPath<Id>,
    ApiJson(patch): ApiJson<AuctionPatch>,
) -> Result<Json<Auction>, ApiError> {
    Ok(Json(
        state
            .market
            .update_auction_fields(&caller.viewer, auction_id, patch)
            .await?,
    ))
}

/// `POST /api/auctions/{id}/activate`
pub async fn activate_auction(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiPath(auction_id): ApiPath<Id>,
) -> Result<Json<Auction>, ApiError> {
    Ok(Json(
        state
            .market
            .activate_auction(&caller.viewer, auction_id)
            .await?,
    ))
}

/// `POST /api/auctions/{id}/close`
pub async fn close_auction(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiPath(auction_id): ApiPath<Id>,
) -> Result<Json<Auction>, ApiError> {
    Ok(Json(
        state.market.close_auction(&caller.viewer, auction_id).await?,
    ))
}

/// `POST /api/auctions/{id}/invitations`
pub async fn invite_supplier(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiPath(auction_id): ApiPath<Id>,
    ApiJson(request): ApiJson<InviteRequest>,
) -> Result<(StatusCode, Json<Invitation>), ApiError> {
    let invitation = state
        .market
        .invite_supplier(&caller.viewer, auction_id, request.supplier_id)
        .await?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

/// `POST /api/auctions/{id}/invitation/respond`
pub async fn respond_to_invitation(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiPath(auction_id): ApiPath<Id>,
    ApiJson(request): ApiJson<RespondRequest>,
) -> Result<Json<Invitation>, ApiError> {
    Ok(Json(
        state
            .market
            .respond_to_invitation(&caller.viewer, auction_id, request.accept)
            .await?,
    ))
}

/// `POST /api/auctions/{id}/bids`
pub async fn submit_bid(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiPath(auction_id): ApiPath<Id>,
    ApiJson(submission): ApiJson<BidSubmission>,
) -> Result<(StatusCode, Json<BidWithItems>), ApiError> {
    let bid = state
        .market
        .submit_bid(&caller.viewer, auction_id, submission)
        .await?;
    Ok((StatusCode::CREATED, Json(bid)))
}

/// `PATCH /api/bids/{id}` with `{"status": "accepted" | "rejected"}`.
pub async fn decide_bid(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiPath(bid_id): ApiPath<Id>,
    ApiJson(request): ApiJson<DecisionRequest>,
) -> Result<Json<Bid>, ApiError> {
    Ok(Json(
        state
            .market
            .decide_bid(&caller.viewer, bid_id, request.status)
            .await?,
    ))
}
