use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::Audit;
use crate::error::{CoreError, Result};
use crate::ports::rbac::RoleRepository;
use crate::rbac::{AuthoritySet, Role};

const ROLE_COLUMNS: &str = "id, created_at, updated_at, created_by, updated_by, \
     deleted, version, code, name, description, status, sort_order";

/// PostgreSQL-backed implementation of the `RoleRepository` port.
#[derive(Clone, Debug)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn authority_set_for_user(&self, user_id: Uuid) -> Result<AuthoritySet> {
        let role_codes = sqlx::query_scalar::<_, String>(
            r#"
            SELECT r.code
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1 AND r.status = 1 AND r.deleted = FALSE
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        let permission_codes = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT p.code
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            JOIN roles r ON r.id = rp.role_id
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
              AND r.status = 1 AND r.deleted = FALSE
              AND p.status = 1 AND p.deleted = FALSE
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(AuthoritySet::from_codes(role_codes, permission_codes))
    }

    async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<Role>> {
        let sql = "SELECT r.id, r.created_at, r.updated_at, r.created_by, \
             r.updated_by, r.deleted, r.version, r.code, r.name, \
             r.description, r.status, r.sort_order \
             FROM roles r \
             JOIN user_roles ur ON ur.role_id = r.id \
             WHERE ur.user_id = $1 AND r.deleted = FALSE \
             ORDER BY r.sort_order, r.code";
        let rows = sqlx::query_as::<_, RoleRow>(sql)
            .bind(user_id)
            .fetch_all(self.pool())
            .await?;

        Ok(rows.into_iter().map(RoleRow::into_role).collect())
    }

    async fn list(&self) -> Result<Vec<Role>> {
        let sql = format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE deleted = FALSE \
             ORDER BY sort_order, code"
        );
        let rows = sqlx::query_as::<_, RoleRow>(&sql)
            .fetch_all(self.pool())
            .await?;

        Ok(rows.into_iter().map(RoleRow::into_role).collect())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Role>> {
        let sql = format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE code = $1 AND deleted = FALSE"
        );
        let row = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(code)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(RoleRow::into_role))
    }

    async fn assign_roles(&self, user_id: Uuid, role_ids: &[Uuid]) -> Result<()> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| CoreError::Database(format!("failed to start transaction: {e}")))?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for role_id in role_ids {
            sqlx::query(
                "INSERT INTO user_roles (user_id, role_id, granted_at) VALUES ($1, $2, NOW())",
            )
            .bind(user_id)
            .bind(role_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| CoreError::Database(format!("failed to commit transaction: {e}")))?;

        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RoleRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    created_by: Option<String>,
    updated_by: Option<String>,
    deleted: bool,
    version: i32,
    code: String,
    name: String,
    description: Option<String>,
    status: i16,
    sort_order: i32,
}

impl RoleRow {
    fn into_role(self) -> Role {
        Role {
            audit: Audit {
                id: self.id,
                created_at: self.created_at,
                updated_at: self.updated_at,
                created_by: self.created_by,
                updated_by: self.updated_by,
                deleted: self.deleted,
                version: self.version,
            },
            code: self.code,
            name: self.name,
            description: self.description,
            status: self.status,
            sort_order: self.sort_order,
        }
    }
}
