//! Route guards layered on top of the authenticator.
//!
//! The authenticator only establishes who the caller is; guards decide
//! whether that caller may pass. Every denial is logged with enough
//! context to audit who tried to reach what.

use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use servehub_core::rbac::{AccessRequirement, Identity, Logic};

use crate::infra::errors::AppError;

/// Enforce an access requirement against the request's identity. Used
/// through [`axum::middleware::from_fn`] on a route group:
///
/// ```ignore
/// .route_layer(middleware::from_fn(move |req, next| {
///     guard::check(AccessRequirement::permissions(&["system:user:list"], Logic::All), req, next)
/// }))
/// ```
pub async fn check(
    requirement: AccessRequirement,
    request: Request<Body>,
    next: Next,
) -> Response {
    let identity = request.extensions().get::<Identity>();

    if let Err(err) = requirement.evaluate(identity) {
        let caller = identity.map(|i| i.username.as_str()).unwrap_or("<anonymous>");
        let held = identity.map(|i| &i.authorities);
        tracing::warn!(
            caller,
            path = %request.uri().path(),
            required = ?requirement.codes,
            kind = ?requirement.kind,
            held = ?held,
            reason = %err,
            "access denied"
        );
        return AppError::from(err).into_response();
    }

    next.run(request).await
}

/// Requirement that only demands a valid login.
pub const fn authenticated() -> AccessRequirement {
    AccessRequirement::permissions(&[], Logic::All)
}
