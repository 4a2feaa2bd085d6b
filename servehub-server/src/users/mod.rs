//! Administrative user management endpoints.

pub mod handlers;
