#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;

use partbid_core::seed::load_demo_data;
use partbid_core::{Marketplace, MemoryStore};
use partbid_server::auth::JwtManager;
use partbid_server::http::{AppState, build_router};

async fn app() -> Router {
    let market = Marketplace::new(Arc::new(MemoryStore::new()));
    load_demo_data(&market).await.unwrap();
    build_router(AppState::new(
        market,
        JwtManager::new(b"api-test-secret", 3600),
    ))
}

/// Send a request and return (status, JSON body or `Null`).
async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["accessToken"].as_str().unwrap().to_string()
}

fn auction_body(supplier_ids: &[i64]) -> Value {
    let now = Utc::now();
    json!({
        "title": "Wheel bearings",
        "description": "Front wheel bearings",
        "auctionType": "urgent",
        "startDate": now.to_rfc3339(),
        "endDate": (now + Duration::days(5)).to_rfc3339(),
        "items": [{
            "partNumber": "WB-100",
            "name": "Front wheel bearing",
            "quantity": 10,
            "unitOfMeasure": "pcs",
        }],
        "supplierIds": supplier_ids,
    })
}

#[tokio::test]
async fn health_is_public() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn login_returns_token_and_account() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "glavautoz", "password": "supplier123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["expiresIn"], 3600);
    assert_eq!(body["account"]["role"], "supplier");
    assert_eq!(body["account"]["supplier"]["companyName"], "GlavAutoParts");
    assert!(body["account"].get("passwordHash").is_none());
}

#[tokio::test]
async fn wrong_password_is_401_with_error_body() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "manager", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_credentials");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn missing_or_bad_token_is_401() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/api/auctions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, _) = send(&app, Method::GET, "/api/auctions", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_reflects_the_token_owner() {
    let app = app().await;
    let token = login(&app, "manager", "manager123").await;
    let (status, body) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "manager");
    assert!(body["supplier"].is_null());
}

#[tokio::test]
async fn supplier_cannot_create_auction() {
    let app = app().await;
    let token = login(&app, "avtoplus", "supplier123").await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auctions",
        Some(&token),
        Some(auction_body(&[])),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "permission_denied");
}

#[tokio::test]
async fn auction_to_award_flow() {
    let app = app().await;
    let manager = login(&app, "manager", "manager123").await;
    let supplier = login(&app, "maxauto", "supplier123").await;

    let (_, suppliers) = send(&app, Method::GET, "/api/suppliers", Some(&manager), None).await;
    let maxauto = suppliers
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["companyName"] == "MaxAuto")
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/auctions",
        Some(&manager),
        Some(auction_body(&[maxauto])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["status"], "draft");
    assert_eq!(created["invitations"].as_array().unwrap().len(), 1);
    let auction_id = created["id"].as_i64().unwrap();
    let item_id = created["items"][0]["id"].as_i64().unwrap();

    let bid = json!({
        "items": [{ "auctionItemId": item_id, "pricePerUnit": 250, "quantity": 10 }],
        "deliveryDate": (Utc::now() + Duration::days(7)).to_rfc3339(),
    });
    let bids_uri = format!("/api/auctions/{auction_id}/bids");

    // Draft auctions take no bids.
    let (status, body) = send(
        &app,
        Method::POST,
        &bids_uri,
        Some(&supplier),
        Some(bid.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_state");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/auctions/{auction_id}/activate"),
        Some(&manager),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");

    let (status, placed) = send(&app, Method::POST, &bids_uri, Some(&supplier), Some(bid)).await;
    assert_eq!(status, StatusCode::CREATED, "{placed}");
    assert_eq!(placed["totalAmount"], 2500);
    let bid_id = placed["id"].as_i64().unwrap();

    let decide_uri = format!("/api/bids/{bid_id}");
    let (status, decided) = send(
        &app,
        Method::PATCH,
        &decide_uri,
        Some(&manager),
        Some(json!({ "status": "accepted" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["status"], "accepted");

    let (_, detail) = send(
        &app,
        Method::GET,
        &format!("/api/auctions/{auction_id}"),
        Some(&manager),
        None,
    )
    .await;
    assert_eq!(detail["status"], "completed");
    assert_eq!(detail["winningBidId"], bid_id);
    assert_eq!(detail["bids"][0]["items"][0]["totalPrice"], 2500);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/auctions/{auction_id}/close"),
        Some(&manager),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, notifications) =
        send(&app, Method::GET, "/api/notifications", Some(&supplier), None).await;
    assert!(
        notifications
            .as_array()
            .unwrap()
            .iter()
            .any(|n| n["title"] == "Your bid was accepted")
    );
}

#[tokio::test]
async fn uninvited_supplier_cannot_open_auction() {
    let app = app().await;
    let manager = login(&app, "manager", "manager123").await;
    let supplier = login(&app, "glavautoz", "supplier123").await;

    let (_, created) = send(
        &app,
        Method::POST,
        "/api/auctions",
        Some(&manager),
        Some(auction_body(&[])),
    )
    .await;
    let uri = format!("/api/auctions/{}", created["id"]);

    let (status, _) = send(&app, Method::GET, &uri, Some(&supplier), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, listed) = send(&app, Method::GET, "/api/auctions", Some(&supplier), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn deactivated_user_token_stops_working() {
    let app = app().await;
    let admin = login(&app, "admin", "admin123").await;
    let supplier = login(&app, "avtoplus", "supplier123").await;

    let (_, me) = send(&app, Method::GET, "/api/auth/me", Some(&supplier), None).await;
    let user_id = me["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/api/users/{user_id}/active"),
        Some(&admin),
        Some(json!({ "active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], false);

    let (status, _) = send(&app, Method::GET, "/api/auth/me", Some(&supplier), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_input_is_400() {
    let app = app().await;
    let manager = login(&app, "manager", "manager123").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auctions",
        Some(&manager),
        Some(json!({ "title": 42 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/auctions?status=paused",
        Some(&manager),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn register_then_login() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "username": "newparts",
            "email": "sales@newparts.example",
            "password": "longenough",
            "fullName": "Nina Novak",
            "companyName": "New Parts",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["role"], "supplier");

    let token = login(&app, "newparts", "longenough").await;
    let (status, stats) = send(&app, Method::GET, "/api/stats", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalAuctions"], 0);
}

#[tokio::test]
async fn activity_respects_limit() {
    let app = app().await;
    let manager = login(&app, "manager", "manager123").await;
    let (status, body) = send(
        &app,
        Method::GET,
        "/api/activity?limit=2",
        Some(&manager),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}
