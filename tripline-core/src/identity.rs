use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

/// The verified identity of the human operator behind a request. Produced
/// by an external verifier; the workflow only compares it to trip ownership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Map a bearer credential to an identity, or `Unauthorized`.
    async fn verify(&self, credential: &str) -> Result<Identity, WorkflowError>;
}

/// Accepts any non-empty credential as the identity itself. Development and
/// test stand-in for the real verifier.
pub struct StaticVerifier;

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, credential: &str) -> Result<Identity, WorkflowError> {
        if credential.is_empty() {
            return Err(WorkflowError::Unauthorized);
        }
        tracing::debug!("Static identity verification for {}", credential);
        Ok(Identity {
            id: credential.to_string(),
            email: None,
        })
    }
}
