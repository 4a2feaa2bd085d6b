//! Repository ports: the trait boundary between domain logic and the store.

pub mod rbac;
pub mod users;

pub use rbac::RoleRepository;
pub use users::UserRepository;
