use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{AuthError, Caller};
use crate::error::ApiError;
use crate::state::AppState;

/// Bearer authentication middleware: verifies the token with the identity
/// provider, resolves the application user and injects [`Caller`]
pub async fn require_caller(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?;

    let user = state.identity.verify(&token).await?;

    let app_user = state
        .store
        .find_app_user(&user.id)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Authenticated user {} has no app_users row", user.id);
            AuthError::NotProvisioned
        })?;

    let caller = Caller::new(user, app_user);
    tracing::debug!("Authenticated {} (firm {})", caller.app_user_id, caller.firm_id);

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

/// Extract the token from `Authorization: Bearer <token>`; the scheme is
/// case-insensitive
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let header = headers.get(AUTHORIZATION).ok_or(AuthError::MissingHeader)?;

    let value = header.to_str().map_err(|_| AuthError::MalformedHeader)?;
    if value.trim().is_empty() {
        return Err(AuthError::MissingHeader);
    }

    let (scheme, token) = value.split_once(' ').ok_or(AuthError::MalformedHeader)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }

    Ok(token.to_string())
}
