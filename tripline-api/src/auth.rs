use async_trait::async_trait;
use axum::{extract::State, routing::post, Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tripline_core::error::{StoreError, WorkflowError};
use tripline_core::identity::{Identity, IdentityVerifier};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OwnerClaims {
    pub sub: String,
    pub email: Option<String>,
    pub role: String,
    pub exp: usize,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/auth/guest", post(login_guest))
}

async fn login_guest(State(state): State<AppState>) -> Result<Json<AuthResponse>, AppError> {
    let my_claims = OwnerClaims {
        sub: format!("owner-{}", Uuid::new_v4()),
        email: None,
        role: "OWNER".to_owned(),
        exp: (Utc::now() + Duration::seconds(state.auth.expiration as i64)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &my_claims,
        &EncodingKey::from_secret(state.auth.secret.as_bytes()),
    )
    .map_err(|e| {
        AppError(WorkflowError::Store(StoreError::database(format!(
            "Token encoding failed: {}",
            e
        ))))
    })?;

    Ok(Json(AuthResponse { token }))
}

/// JWT-backed implementation of the identity collaborator.
pub struct JwtVerifier {
    secret: String,
}

impl JwtVerifier {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, credential: &str) -> Result<Identity, WorkflowError> {
        let token_data = decode::<OwnerClaims>(
            credential,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| WorkflowError::Unauthorized)?;

        Ok(Identity {
            id: token_data.claims.sub,
            email: token_data.claims.email,
        })
    }
}
