//! Authentication and authorization: token service, password hashing, the
//! per-request authenticator, and the route guards.

pub mod guard;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod password;
