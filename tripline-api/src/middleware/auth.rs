use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use tripline_core::error::WorkflowError;

use crate::error::AppError;
use crate::state::AppState;

/// Resolves the bearer credential to an owner identity and injects it into
/// the request extensions for the protected routes.
pub async fn owner_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 1. Extract token from Authorization header
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(WorkflowError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(WorkflowError::Unauthorized)?;

    // 2. Verify through the identity collaborator
    let identity = state.verifier.verify(token).await?;

    // 3. Inject identity into request extensions
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
