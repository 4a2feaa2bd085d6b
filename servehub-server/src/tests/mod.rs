//! Server test support: in-memory repository doubles and state builders.


use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use servehub_core::error::{CoreError, Result};
use servehub_core::page::{PageRequest, PageResponse};
use servehub_core::ports::{RoleRepository, UserRepository};
use servehub_core::rbac::{AuthoritySet, Role};
use servehub_core::user::{User, UserFilter, UserStatus};

use crate::auth::password;
use crate::infra::app_state::AppState;
use crate::infra::config::Config;

pub const TEST_SECRET: &str = "unit-test-secret-not-for-production";

pub fn test_config() -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        database_url: "postgres://unused".to_string(),
        jwt_secret: TEST_SECRET.to_string(),
        jwt_access_ttl_secs: 3600,
        jwt_refresh_ttl_secs: 86_400,
        auth_header: "Authorization".to_string(),
        auth_token_prefix: "Bearer ".to_string(),
        cors_allowed_origins: vec!["http://localhost:5173".to_string()],
    }
}

/// In-memory user store honoring the same uniqueness contract as the
/// Postgres implementation.
#[derive(Debug, Default)]
pub struct MemoryUsers {
    rows: Mutex<Vec<User>>,
}

impl MemoryUsers {
    pub fn insert(&self, user: User) {
        self.rows.lock().unwrap().push(user);
    }

    pub fn get(&self, id: Uuid) -> Option<User> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.audit.id == id)
            .cloned()
    }
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.audit.id == id && !u.audit.deleted)
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username && !u.audit.deleted)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email.as_deref() == Some(email) && !u.audit.deleted)
            .cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.phone.as_deref() == Some(phone) && !u.audit.deleted)
            .cloned())
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool> {
        Ok(self.find_by_username(username).await?.is_some())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    async fn exists_by_phone(&self, phone: &str) -> Result<bool> {
        Ok(self.find_by_phone(phone).await?.is_some())
    }

    async fn save(&self, user: &User) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|u| u.username == user.username) {
            return Err(CoreError::Conflict("username".to_string()));
        }
        if user.email.is_some() && rows.iter().any(|u| u.email == user.email) {
            return Err(CoreError::Conflict("email".to_string()));
        }
        if user.phone.is_some() && rows.iter().any(|u| u.phone == user.phone) {
            return Err(CoreError::Conflict("phone".to_string()));
        }
        rows.push(user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|u| u.audit.id == user.audit.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(())
            }
            None => Err(CoreError::NotFound("user".to_string())),
        }
    }

    async fn update_last_login(
        &self,
        id: Uuid,
        time: DateTime<Utc>,
        ip: Option<String>,
    ) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(user) = rows.iter_mut().find(|u| u.audit.id == id) {
            user.last_login_at = Some(time);
            user.last_login_ip = ip;
        }
        Ok(())
    }

    async fn list(&self, page: PageRequest) -> Result<PageResponse<User>> {
        let rows = self.rows.lock().unwrap();
        let live: Vec<User> = rows.iter().filter(|u| !u.audit.deleted).cloned().collect();
        let total = live.len() as i64;
        let items = live
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok(PageResponse::new(items, total, page.normalized()))
    }

    async fn search(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<PageResponse<User>> {
        let matches_keyword = |user: &User| match &filter.keyword {
            None => true,
            Some(kw) => {
                let kw = kw.to_lowercase();
                let fields = [
                    Some(user.username.as_str()),
                    user.real_name.as_deref(),
                    user.email.as_deref(),
                    user.phone.as_deref(),
                ];
                fields
                    .into_iter()
                    .flatten()
                    .any(|f| f.to_lowercase().contains(&kw))
            }
        };

        let rows = self.rows.lock().unwrap();
        let hits: Vec<User> = rows
            .iter()
            .filter(|u| !u.audit.deleted)
            .filter(|u| filter.status.is_none_or(|s| u.status == s))
            .filter(|u| matches_keyword(u))
            .cloned()
            .collect();
        let total = hits.len() as i64;
        let items = hits
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok(PageResponse::new(items, total, page.normalized()))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(user) = rows.iter_mut().find(|u| u.audit.id == id) {
            user.audit.deleted = true;
        }
        Ok(())
    }
}

/// In-memory role store: a role catalog, per-user assignments, and
/// per-role permission grants.
#[derive(Debug, Default)]
pub struct MemoryRoles {
    catalog: Mutex<Vec<Role>>,
    assignments: Mutex<HashMap<Uuid, Vec<Uuid>>>,
    grants: Mutex<HashMap<String, Vec<String>>>,
}

impl MemoryRoles {
    pub fn add_role(&self, role: Role) {
        self.catalog.lock().unwrap().push(role);
    }

    pub fn grant(&self, role_code: &str, permission: &str) {
        self.grants
            .lock()
            .unwrap()
            .entry(role_code.to_string())
            .or_default()
            .push(permission.to_string());
    }

    pub fn assign(&self, user_id: Uuid, role_id: Uuid) {
        self.assignments
            .lock()
            .unwrap()
            .entry(user_id)
            .or_default()
            .push(role_id);
    }
}

#[async_trait]
impl RoleRepository for MemoryRoles {
    async fn authority_set_for_user(&self, user_id: Uuid) -> Result<AuthoritySet> {
        let roles = self.roles_for_user(user_id).await?;
        let grants = self.grants.lock().unwrap();

        let mut permission_codes = Vec::new();
        let mut role_codes = Vec::new();
        for role in roles.iter().filter(|r| r.is_enabled()) {
            role_codes.push(role.code.clone());
            if let Some(perms) = grants.get(&role.code) {
                permission_codes.extend(perms.iter().cloned());
            }
        }

        Ok(AuthoritySet::from_codes(role_codes, permission_codes))
    }

    async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<Role>> {
        let assigned = self
            .assignments
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default();
        let catalog = self.catalog.lock().unwrap();
        Ok(catalog
            .iter()
            .filter(|r| assigned.contains(&r.audit.id))
            .cloned()
            .collect())
    }

    async fn list(&self) -> Result<Vec<Role>> {
        Ok(self.catalog.lock().unwrap().clone())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Role>> {
        Ok(self
            .catalog
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.code == code)
            .cloned())
    }

    async fn assign_roles(&self, user_id: Uuid, role_ids: &[Uuid]) -> Result<()> {
        self.assignments
            .lock()
            .unwrap()
            .insert(user_id, role_ids.to_vec());
        Ok(())
    }
}

pub fn make_role(code: &str) -> Role {
    Role {
        audit: servehub_core::audit::Audit::new(),
        code: code.to_string(),
        name: code.to_string(),
        description: None,
        status: 1,
        sort_order: 0,
    }
}

pub struct TestEnv {
    pub users: Arc<MemoryUsers>,
    pub roles: Arc<MemoryRoles>,
    pub state: AppState,
}

pub fn test_env() -> TestEnv {
    let users = Arc::new(MemoryUsers::default());
    let roles = Arc::new(MemoryRoles::default());
    let state = AppState::new(users.clone(), roles.clone(), test_config());
    TestEnv {
        users,
        roles,
        state,
    }
}

/// Insert an active user with the given credentials, returning its id.
pub async fn seed_user(env: &TestEnv, username: &str, plaintext: &str) -> Uuid {
    let hash = password::hash(plaintext.to_string()).await.unwrap();
    let user = User::new(username.to_string(), hash);
    let id = user.audit.id;
    env.users.insert(user);
    id
}

/// Seed a user holding the given role with the given permission grants.
pub async fn seed_user_with_authorities(
    env: &TestEnv,
    username: &str,
    plaintext: &str,
    role_code: &str,
    permissions: &[&str],
) -> Uuid {
    let user_id = seed_user(env, username, plaintext).await;
    let role = make_role(role_code);
    let role_id = role.audit.id;
    env.roles.add_role(role);
    env.roles.assign(user_id, role_id);
    for perm in permissions {
        env.roles.grant(role_code, perm);
    }
    user_id
}

impl std::fmt::Debug for TestEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestEnv").finish_non_exhaustive()
    }
}

pub fn set_status(env: &TestEnv, id: Uuid, status: UserStatus) {
    let mut rows = env.users.rows.lock().unwrap();
    if let Some(user) = rows.iter_mut().find(|u| u.audit.id == id) {
        user.status = status;
    }
}
