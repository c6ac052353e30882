use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod error;
pub mod middleware;
pub mod quotes;
pub mod respond;
pub mod state;
pub mod stream;
pub mod trips;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    // Owner operations sit behind the identity middleware; the driver-facing
    // routes authenticate with the magic-link token instead.
    let owner_routes = Router::new()
        .route("/v1/trips", post(trips::create_trip))
        .route("/v1/trips/{id}", get(trips::get_trip))
        .route("/v1/trips/{id}/assign", post(trips::assign_driver))
        .route("/v1/trips/{id}/cancel", post(trips::cancel_trip))
        .route("/v1/trips/{id}/resend-link", post(trips::resend_link))
        .route("/v1/trips/{id}/stream", get(stream::stream_trip))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::owner_auth_middleware,
        ));

    let public_routes = Router::new()
        .merge(auth::routes())
        .route("/v1/trips/{id}/respond", post(respond::respond))
        .route("/v1/trips/{id}/tokens/{token}", get(respond::probe_token))
        .route("/v1/trips/{id}/confirm", post(respond::legacy_confirm))
        .route(
            "/v1/trips/{id}/quotes",
            post(quotes::submit_quote).get(quotes::list_quotes),
        );

    Router::new()
        .merge(owner_routes)
        .merge(public_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
