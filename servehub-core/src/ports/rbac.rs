use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::rbac::{AuthoritySet, Role};

/// Persistence port for roles and their permission grants.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Resolve the caller's authority set: permission codes reachable through
    /// the user's enabled roles, plus the `ROLE_`-prefixed role codes.
    /// Disabled roles and disabled permissions contribute nothing.
    async fn authority_set_for_user(&self, user_id: Uuid) -> Result<AuthoritySet>;

    async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<Role>>;
    async fn list(&self) -> Result<Vec<Role>>;
    async fn find_by_code(&self, code: &str) -> Result<Option<Role>>;

    /// Replace the user's role assignments with the given set.
    async fn assign_roles(&self, user_id: Uuid, role_ids: &[Uuid]) -> Result<()>;
}
