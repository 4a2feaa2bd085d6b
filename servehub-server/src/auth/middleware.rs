//! Per-request authenticator.
//!
//! Runs on every route. Extracts the bearer token from the configured
//! header, validates it, loads the subject and their authorities, and
//! attaches an [`Identity`] extension. Any failure along the way degrades
//! the request to unauthenticated instead of rejecting it; the guards
//! decide what anonymous callers may reach.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use servehub_core::rbac::Identity;

use crate::infra::app_state::AppState;

pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    // The token is detached from the request up front; the request body
    // must not be borrowed across the store lookups below.
    if let Some(token) = bearer_token(&state, request.headers()) {
        if let Some(identity) = resolve_identity(&state, &token).await {
            request.extensions_mut().insert(identity);
        }
    }
    next.run(request).await
}

async fn resolve_identity(state: &AppState, token: &str) -> Option<Identity> {
    let claims = match state
        .jwt
        .validate(token, crate::auth::jwt::TokenKind::Access)
    {
        Ok(claims) => claims,
        Err(err) => {
            tracing::debug!(error = %err, "rejected bearer token");
            return None;
        }
    };

    let user = match state.users.find_by_username(&claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::debug!(subject = %claims.sub, "token subject no longer exists");
            return None;
        }
        Err(err) => {
            tracing::error!(error = %err, "identity lookup failed");
            return None;
        }
    };

    if !user.status.is_active() {
        tracing::debug!(subject = %user.username, "token subject is disabled");
        return None;
    }

    let authorities = match state.roles.authority_set_for_user(user.audit.id).await {
        Ok(set) => set,
        Err(err) => {
            tracing::error!(error = %err, "authority lookup failed");
            return None;
        }
    };

    Some(Identity {
        user_id: user.audit.id,
        username: user.username,
        status: user.status,
        authorities,
    })
}

/// Pull the raw token out of the configured header, stripping the
/// configured prefix. A header without the prefix yields nothing.
fn bearer_token(state: &AppState, headers: &HeaderMap) -> Option<String> {
    let value = headers
        .get(state.config.auth_header.as_str())?
        .to_str()
        .ok()?;

    let token = value
        .strip_prefix(state.config.auth_token_prefix.as_str())?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
