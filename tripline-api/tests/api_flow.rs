use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use tripline_api::{
    app,
    auth::JwtVerifier,
    state::{AppState, AuthConfig},
};
use tripline_core::repository::TokenRepository;
use tripline_store::memory::MemoryStore;
use tripline_store::LogDispatcher;
use tripline_workflow::{AssignmentCoordinator, QuoteRegistry, TokenManager};

const TEST_SECRET: &str = "test-secret";

fn test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(LogDispatcher);
    let coordinator = Arc::new(AssignmentCoordinator::new(
        store.clone(),
        store.clone(),
        notifier,
        "http://localhost:8084".to_string(),
    ));
    let tokens = Arc::new(TokenManager::new(store.clone(), store.clone()));
    let quotes = Arc::new(QuoteRegistry::new(store.clone()));

    let state = AppState {
        trips: store.clone(),
        coordinator,
        tokens,
        quotes,
        feed: store.feed().clone(),
        verifier: Arc::new(JwtVerifier::new(TEST_SECRET.to_string())),
        auth: AuthConfig {
            secret: TEST_SECRET.to_string(),
            expiration: 3600,
        },
    };
    (app(state), store)
}

async fn send_json(
    app: &Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login(app: &Router) -> String {
    let (status, body) = send_json(app, Method::POST, "/v1/auth/guest", None, None).await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

async fn create_trip(app: &Router, bearer: &str) -> Uuid {
    let (status, body) = send_json(
        app,
        Method::POST,
        "/v1/trips",
        Some(bearer),
        Some(json!({ "pickup_location": "Geneva Airport" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_owner_routes_require_credentials() {
    let (app, _store) = test_app();
    let (status, _) = send_json(&app, Method::POST, "/v1/trips", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send_json(
        &app,
        Method::POST,
        "/v1/trips",
        Some("not-a-jwt"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_assignment_and_response_over_http() {
    let (app, store) = test_app();
    let bearer = login(&app).await;
    let trip_id = create_trip(&app, &bearer).await;

    // 1. Assign the driver
    let (status, body) = send_json(
        &app,
        Method::POST,
        &format!("/v1/trips/{}/assign", trip_id),
        Some(&bearer),
        Some(json!({ "driver_email": " D@X.com " })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trip"]["status"], "PENDING");
    assert_eq!(body["trip"]["driver"], "d@x.com");

    // 2. The driver probes the link before acting
    let tokens = store.tokens_for_driver(trip_id, "d@x.com").await.unwrap();
    let token_value = tokens[0].token.clone();
    let (status, body) = send_json(
        &app,
        Method::GET,
        &format!("/v1/trips/{}/tokens/{}", trip_id, token_value),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_take_action"], true);
    assert_eq!(body["trip_status"], "PENDING");

    // 3. Accept through the magic link
    let (status, body) = send_json(
        &app,
        Method::POST,
        &format!("/v1/trips/{}/respond", trip_id),
        None,
        Some(json!({ "token": token_value, "decision": "ACCEPT" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CONFIRMED");

    // 4. The same link cannot be used twice
    let (status, body) = send_json(
        &app,
        Method::POST,
        &format!("/v1/trips/{}/respond", trip_id),
        None,
        Some(json!({ "token": token_value, "decision": "ACCEPT" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already been used"));

    // 5. Owner sees the confirmed trip
    let (status, body) = send_json(
        &app,
        Method::GET,
        &format!("/v1/trips/{}", trip_id),
        Some(&bearer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CONFIRMED");
}

#[tokio::test]
async fn test_cancelled_trip_fails_late_responses_closed() {
    let (app, store) = test_app();
    let bearer = login(&app).await;
    let trip_id = create_trip(&app, &bearer).await;

    send_json(
        &app,
        Method::POST,
        &format!("/v1/trips/{}/assign", trip_id),
        Some(&bearer),
        Some(json!({ "driver_email": "d@x.com" })),
    )
    .await;
    let tokens = store.tokens_for_driver(trip_id, "d@x.com").await.unwrap();
    let token_value = tokens[0].token.clone();

    let (status, body) = send_json(
        &app,
        Method::POST,
        &format!("/v1/trips/{}/cancel", trip_id),
        Some(&bearer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trip"]["status"], "CANCELLED");
    assert_eq!(body["trip"]["driver"], Value::Null);

    // The defused link reports the cancellation distinctly.
    let (status, body) = send_json(
        &app,
        Method::POST,
        &format!("/v1/trips/{}/respond", trip_id),
        None,
        Some(json!({ "token": token_value, "decision": "ACCEPT" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("cancelled"));
}

#[tokio::test]
async fn test_quote_submission_and_views() {
    let (app, _store) = test_app();
    let bearer = login(&app).await;
    let trip_id = create_trip(&app, &bearer).await;

    // First submission, then an upserting resubmission.
    let (status, _) = send_json(
        &app,
        Method::POST,
        &format!("/v1/trips/{}/quotes", trip_id),
        None,
        Some(json!({ "driver_email": "d@x.com", "price": 150.0, "currency": "EUR" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(
        &app,
        Method::POST,
        &format!("/v1/trips/{}/quotes", trip_id),
        None,
        Some(json!({ "driver_email": "d@x.com", "price": 175.0, "currency": "EUR" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Another driver quotes too.
    send_json(
        &app,
        Method::POST,
        &format!("/v1/trips/{}/quotes", trip_id),
        None,
        Some(json!({ "driver_email": "e@y.com", "price": 120.0, "currency": "USD" })),
    )
    .await;

    // Driver view: own row only, reflecting the second price.
    let (status, body) = send_json(
        &app,
        Method::GET,
        &format!("/v1/trips/{}/quotes?driver_email=d@x.com", trip_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["price"], 175.0);

    // Owner view: all quotes, requires the credential.
    let (status, _) = send_json(
        &app,
        Method::GET,
        &format!("/v1/trips/{}/quotes", trip_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send_json(
        &app,
        Method::GET,
        &format!("/v1/trips/{}/quotes", trip_id),
        Some(&bearer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    // Malformed submissions are rejected.
    let (status, _) = send_json(
        &app,
        Method::POST,
        &format!("/v1/trips/{}/quotes", trip_id),
        None,
        Some(json!({ "driver_email": "d@x.com", "price": -1.0, "currency": "EUR" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_legacy_confirm_route() {
    let (app, _store) = test_app();
    let bearer = login(&app).await;
    let trip_id = create_trip(&app, &bearer).await;

    send_json(
        &app,
        Method::POST,
        &format!("/v1/trips/{}/assign", trip_id),
        Some(&bearer),
        Some(json!({ "driver_email": "d@x.com" })),
    )
    .await;

    let (status, _) = send_json(
        &app,
        Method::POST,
        &format!("/v1/trips/{}/confirm", trip_id),
        None,
        Some(json!({ "driver_email": "other@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send_json(
        &app,
        Method::POST,
        &format!("/v1/trips/{}/confirm", trip_id),
        None,
        Some(json!({ "driver_email": "D@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CONFIRMED");
}

#[tokio::test]
async fn test_strangers_cannot_touch_another_owners_trip() {
    let (app, _store) = test_app();
    let owner = login(&app).await;
    let stranger = login(&app).await;
    let trip_id = create_trip(&app, &owner).await;

    let (status, _) = send_json(
        &app,
        Method::POST,
        &format!("/v1/trips/{}/assign", trip_id),
        Some(&stranger),
        Some(json!({ "driver_email": "d@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send_json(
        &app,
        Method::POST,
        &format!("/v1/trips/{}/cancel", trip_id),
        Some(&stranger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
