use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::audit::Audit;
use crate::error::{CoreError, Result};
use crate::page::{PageRequest, PageResponse};
use crate::ports::users::UserRepository;
use crate::user::{User, UserFilter, UserStatus};

const USER_COLUMNS: &str = "id, created_at, updated_at, created_by, updated_by, \
     deleted, version, username, password_hash, real_name, email, phone, \
     avatar, gender, status, user_type, last_login_at, last_login_ip, remark";

/// PostgreSQL-backed implementation of the `UserRepository` port.
#[derive(Clone, Debug)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {column} = $1 AND deleted = FALSE"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(UserRow::into_user))
    }

    async fn exists(&self, column: &str, value: &str) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM users WHERE {column} = $1 AND deleted = FALSE)"
        );
        let exists = sqlx::query_scalar::<_, bool>(&sql)
            .bind(value)
            .fetch_one(self.pool())
            .await?;

        Ok(exists)
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted = FALSE"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(UserRow::into_user))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_one("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_one("email", email).await
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>> {
        self.find_one("phone", phone).await
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool> {
        self.exists("username", username).await
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool> {
        self.exists("email", email).await
    }

    async fn exists_by_phone(&self, phone: &str) -> Result<bool> {
        self.exists("phone", phone).await
    }

    async fn save(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, created_at, updated_at, created_by, updated_by,
                deleted, version, username, password_hash, real_name,
                email, phone, avatar, gender, status, user_type,
                last_login_at, last_login_ip, remark
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19
            )
            "#,
        )
        .bind(user.audit.id)
        .bind(user.audit.created_at)
        .bind(user.audit.updated_at)
        .bind(&user.audit.created_by)
        .bind(&user.audit.updated_by)
        .bind(user.audit.deleted)
        .bind(user.audit.version)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.real_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.avatar)
        .bind(user.gender)
        .bind(user.status)
        .bind(user.user_type)
        .bind(user.last_login_at)
        .bind(&user.last_login_ip)
        .bind(&user.remark)
        .execute(self.pool())
        .await
        .map_err(map_unique_violation)?;

        info!("Created user: {} ({})", user.username, user.audit.id);
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                updated_at = $2, updated_by = $3, version = version + 1,
                real_name = $4, email = $5, phone = $6, avatar = $7,
                gender = $8, status = $9, remark = $10, password_hash = $11
            WHERE id = $1 AND deleted = FALSE
            "#,
        )
        .bind(user.audit.id)
        .bind(user.audit.updated_at)
        .bind(&user.audit.updated_by)
        .bind(&user.real_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.avatar)
        .bind(user.gender)
        .bind(user.status)
        .bind(&user.remark)
        .bind(&user.password_hash)
        .execute(self.pool())
        .await
        .map_err(map_unique_violation)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!(
                "user {} not found",
                user.audit.id
            )));
        }

        Ok(())
    }

    async fn update_last_login(
        &self,
        id: Uuid,
        time: DateTime<Utc>,
        ip: Option<String>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE users SET last_login_at = $2, last_login_ip = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(time)
        .bind(ip)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    async fn list(&self, page: PageRequest) -> Result<PageResponse<User>> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE deleted = FALSE",
        )
        .fetch_one(self.pool())
        .await?;

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE deleted = FALSE \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool())
            .await?;

        let users = rows.into_iter().map(UserRow::into_user).collect();
        Ok(PageResponse::new(users, total, page))
    }

    async fn search(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<PageResponse<User>> {
        // NULL filters collapse to TRUE, so one statement serves every
        // combination without dynamic SQL.
        let pattern = filter.keyword.as_ref().map(|kw| format!("%{kw}%"));
        let status = filter.status.map(|s| s as i16);

        const MATCH: &str = "deleted = FALSE \
             AND ($1::text IS NULL OR username ILIKE $1 OR real_name ILIKE $1 \
                  OR email ILIKE $1 OR phone ILIKE $1) \
             AND ($2::smallint IS NULL OR status = $2)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM users WHERE {MATCH}"
        ))
        .bind(&pattern)
        .bind(status)
        .fetch_one(self.pool())
        .await?;

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {MATCH} \
             ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&pattern)
            .bind(status)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool())
            .await?;

        let users = rows.into_iter().map(UserRow::into_user).collect();
        Ok(PageResponse::new(users, total, page))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET deleted = TRUE, updated_at = NOW() WHERE id = $1 AND deleted = FALSE",
        )
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("user {id} not found")));
        }

        Ok(())
    }
}

/// Translate unique-constraint violations into clean conflicts. The
/// constraint is the source of truth when concurrent writes race past the
/// `exists_*` pre-checks.
fn map_unique_violation(err: sqlx::Error) -> CoreError {
    if let Some(db_err) = err.as_database_error() {
        match db_err.constraint() {
            Some("users_username_key") => {
                return CoreError::Conflict("username".to_string());
            }
            Some("users_email_key") => {
                return CoreError::Conflict("email".to_string());
            }
            Some("users_phone_key") => {
                return CoreError::Conflict("phone".to_string());
            }
            _ => {}
        }
    }
    CoreError::from(err)
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    created_by: Option<String>,
    updated_by: Option<String>,
    deleted: bool,
    version: i32,
    username: String,
    password_hash: String,
    real_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    avatar: Option<String>,
    gender: i16,
    status: UserStatus,
    user_type: i16,
    last_login_at: Option<DateTime<Utc>>,
    last_login_ip: Option<String>,
    remark: Option<String>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            audit: Audit {
                id: self.id,
                created_at: self.created_at,
                updated_at: self.updated_at,
                created_by: self.created_by,
                updated_by: self.updated_by,
                deleted: self.deleted,
                version: self.version,
            },
            username: self.username,
            password_hash: self.password_hash,
            real_name: self.real_name,
            email: self.email,
            phone: self.phone,
            avatar: self.avatar,
            gender: self.gender,
            status: self.status,
            user_type: self.user_type,
            last_login_at: self.last_login_at,
            last_login_ip: self.last_login_ip,
            remark: self.remark,
        }
    }
}
