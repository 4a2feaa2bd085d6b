//! PostgreSQL implementations of the repository ports.

pub mod rbac;
pub mod users;

pub use rbac::PostgresRoleRepository;
pub use users::PostgresUserRepository;
