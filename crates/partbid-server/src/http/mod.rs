//! JSON API over the marketplace.

pub mod auctions;
pub mod auth;
pub mod error;
pub mod extract;
pub mod feed;
pub mod users;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use partbid_core::Marketplace;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::JwtManager;

pub use error::ApiError;
pub use extract::CurrentUser;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub market: Arc<Marketplace>,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(market: Marketplace, jwt: JwtManager) -> Self {
        Self {
            market: Arc::new(market),
            jwt: Arc::new(jwt),
        }
    }
}

/// Build the full API router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(feed::health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route("/api/users/{id}/active", patch(users::set_user_active))
        .route("/api/suppliers", get(users::list_suppliers))
        .route("/api/suppliers/{id}", get(users::get_supplier))
        .route("/api/suppliers/{id}/rating", patch(users::rate_supplier))
        .route(
            "/api/auctions",
            get(auctions::list_auctions).post(auctions::create_auction),
        )
        .route(
            "/api/auctions/{id}",
            get(auctions::get_auction).patch(auctions::update_auction),
        )
        .route("/api/auctions/{id}/activate", post(auctions::activate_auction))
        .route("/api/auctions/{id}/close", post(auctions::close_auction))
        .route("/api/auctions/{id}/invitations", post(auctions::invite_supplier))
        .route(
            "/api/auctions/{id}/invitation/respond",
            post(auctions::respond_to_invitation),
        )
        .route("/api/auctions/{id}/bids", post(auctions::submit_bid))
        .route("/api/bids/{id}", patch(auctions::decide_bid))
        .route("/api/notifications", get(feed::list_notifications))
        .route("/api/notifications/{id}", patch(feed::mark_notification_read))
        .route("/api/activity", get(feed::list_activity))
        .route("/api/stats", get(feed::stats))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
