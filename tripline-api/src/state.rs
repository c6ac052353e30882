use std::sync::Arc;

use tripline_core::identity::IdentityVerifier;
use tripline_core::repository::TripRepository;
use tripline_store::TripFeed;
use tripline_workflow::{AssignmentCoordinator, QuoteRegistry, TokenManager};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub trips: Arc<dyn TripRepository>,
    pub coordinator: Arc<AssignmentCoordinator>,
    pub tokens: Arc<TokenManager>,
    pub quotes: Arc<QuoteRegistry>,
    pub feed: TripFeed,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub auth: AuthConfig,
}
