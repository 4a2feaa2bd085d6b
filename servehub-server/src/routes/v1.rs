//! Version 1 API surface.
//!
//! The authenticator runs over the whole router; individual groups carry
//! their own guards, so a route added to the wrong group fails closed
//! rather than open.

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use servehub_core::rbac::{permissions, roles, AccessRequirement, Logic};

use crate::auth::{guard, handlers as auth_handlers, middleware::authenticate};
use crate::infra::app_state::AppState;
use crate::users::handlers as user_handlers;

const LIST_USERS: AccessRequirement =
    AccessRequirement::permissions(&[permissions::USER_LIST], Logic::All);
const READ_USER: AccessRequirement =
    AccessRequirement::permissions(&[permissions::USER_READ], Logic::All);
const UPDATE_USER: AccessRequirement =
    AccessRequirement::permissions(&[permissions::USER_UPDATE], Logic::All);
const DELETE_USER: AccessRequirement =
    AccessRequirement::permissions(&[permissions::USER_DELETE], Logic::All);
const ASSIGN_ROLES: AccessRequirement = AccessRequirement::permissions(
    &[permissions::USER_UPDATE, permissions::USER_ASSIGN_ROLE],
    Logic::All,
);
const LIST_ROLES: AccessRequirement =
    AccessRequirement::permissions(&[permissions::ROLE_LIST], Logic::All);
// Status toggles are an administrative act, gated on role rather than on a
// fine-grained permission.
const TOGGLE_STATUS: AccessRequirement =
    AccessRequirement::roles(&[roles::ADMIN], Logic::Any);

macro_rules! require {
    ($requirement:expr) => {
        middleware::from_fn(
            move |request: axum::extract::Request, next: middleware::Next| {
                guard::check($requirement, request, next)
            },
        )
    };
}

pub fn create_v1_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/register", post(auth_handlers::register))
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/refresh", post(auth_handlers::refresh))
        .route("/auth/availability", get(auth_handlers::availability));

    let session = Router::new()
        .route("/auth/logout", post(auth_handlers::logout))
        .route("/auth/me", get(auth_handlers::me))
        .route_layer(require!(guard::authenticated()));

    let admin = Router::new()
        .route(
            "/users",
            get(user_handlers::list_users).route_layer(require!(LIST_USERS)),
        )
        .route(
            "/users/search",
            get(user_handlers::search_users).route_layer(require!(LIST_USERS)),
        )
        .route(
            "/users/{id}",
            get(user_handlers::get_user).route_layer(require!(READ_USER)),
        )
        .route(
            "/users/{id}",
            put(user_handlers::update_user).route_layer(require!(UPDATE_USER)),
        )
        .route(
            "/users/{id}",
            axum::routing::delete(user_handlers::delete_user).route_layer(require!(DELETE_USER)),
        )
        .route(
            "/users/{id}/password",
            put(user_handlers::reset_password).route_layer(require!(UPDATE_USER)),
        )
        .route(
            "/users/{id}/status",
            put(user_handlers::update_status).route_layer(require!(TOGGLE_STATUS)),
        )
        .route(
            "/users/{id}/roles",
            put(user_handlers::assign_roles).route_layer(require!(ASSIGN_ROLES)),
        )
        .route(
            "/roles",
            get(user_handlers::list_roles).route_layer(require!(LIST_ROLES)),
        );

    Router::new()
        .merge(public)
        .merge(session)
        .merge(admin)
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .with_state(state)
}
