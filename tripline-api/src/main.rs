use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tripline_api::{
    app,
    auth::JwtVerifier,
    state::{AppState, AuthConfig},
};
use tripline_store::quote_repo::PgQuoteRepository;
use tripline_store::token_repo::PgTokenRepository;
use tripline_store::trip_repo::PgTripRepository;
use tripline_store::{DbClient, LogDispatcher, TripFeed};
use tripline_workflow::{AssignmentCoordinator, QuoteRegistry, TokenManager};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tripline_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = tripline_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Tripline API on port {}", config.server.port);

    // Database connection + migrations
    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    // Trip change feed
    let feed = TripFeed::new(config.business_rules.trip_feed_capacity);

    // Repositories
    let trips = Arc::new(PgTripRepository::new(db.pool.clone(), feed.clone()));
    let token_repo = Arc::new(PgTokenRepository::new(db.pool.clone()));
    let quote_repo = Arc::new(PgQuoteRepository::new(db.pool.clone()));

    // Collaborators + engines
    let notifier = Arc::new(LogDispatcher);
    let coordinator = Arc::new(AssignmentCoordinator::with_token_ttl_days(
        trips.clone(),
        token_repo.clone(),
        notifier,
        config.business_rules.link_base_url.clone(),
        config.business_rules.token_ttl_days,
    ));
    let tokens = Arc::new(TokenManager::with_ttl_days(
        token_repo,
        trips.clone(),
        config.business_rules.token_ttl_days,
    ));
    let quotes = Arc::new(QuoteRegistry::new(quote_repo));
    let verifier = Arc::new(JwtVerifier::new(config.auth.jwt_secret.clone()));

    let app_state = AppState {
        trips,
        coordinator,
        tokens,
        quotes,
        feed,
        verifier,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
