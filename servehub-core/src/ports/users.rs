use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::page::{PageRequest, PageResponse};
use crate::user::{User, UserFilter};

/// Persistence port for user accounts.
///
/// `save` must surface uniqueness violations as `CoreError::Conflict` with
/// the violated column named in the message; the store's constraint is the
/// final arbiter when two registrations race past the `exists_*` pre-checks.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>>;

    async fn exists_by_username(&self, username: &str) -> Result<bool>;
    async fn exists_by_email(&self, email: &str) -> Result<bool>;
    async fn exists_by_phone(&self, phone: &str) -> Result<bool>;

    async fn save(&self, user: &User) -> Result<()>;
    async fn update(&self, user: &User) -> Result<()>;

    /// Record a successful login. Best-effort from the caller's perspective;
    /// the gateway logs and ignores failures here. Takes the address as an
    /// owned value so the port stays object-safe to mock.
    async fn update_last_login(
        &self,
        id: Uuid,
        time: DateTime<Utc>,
        ip: Option<String>,
    ) -> Result<()>;

    async fn list(&self, page: PageRequest) -> Result<PageResponse<User>>;

    /// Filtered listing for the admin search view.
    async fn search(&self, filter: &UserFilter, page: PageRequest)
        -> Result<PageResponse<User>>;

    /// Soft delete; the row is kept but filtered out of all queries.
    async fn delete(&self, id: Uuid) -> Result<()>;
}
