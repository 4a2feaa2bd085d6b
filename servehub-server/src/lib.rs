//! ServeHub HTTP server.
//!
//! Axum front end over `servehub-core`: configuration, application state,
//! the JWT token service, per-request authentication, declarative
//! role/permission guards, and the account-management handlers.

pub mod api;
pub mod auth;
pub mod infra;
pub mod routes;
pub mod users;

#[cfg(test)]
mod tests;

pub use infra::app_state::AppState;
