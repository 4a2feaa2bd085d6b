//! Core library for ServeHub.
//!
//! Holds the domain model (users, roles, permissions), the authorization
//! decision logic, the error taxonomy, and the repository ports with their
//! PostgreSQL implementations. The HTTP surface lives in `servehub-server`.

pub mod audit;
pub mod error;
pub mod page;
pub mod ports;
pub mod postgres;
pub mod rbac;
pub mod user;

pub use error::{AuthError, CoreError, Result};
pub use rbac::{AccessRequirement, AuthoritySet, Identity, Logic, RequirementKind};
pub use user::{User, UserStatus};
