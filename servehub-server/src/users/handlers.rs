//! User administration: listing, profile edits, status changes, role
//! assignment. All routes here sit behind permission guards; handlers
//! assume the caller is already authorized.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use servehub_core::error::CoreError;
use servehub_core::page::{PageRequest, PageResponse};
use servehub_core::rbac::Role;
use servehub_core::user::{
    UserFilter, UserStatus, UserUpdateRequest, ValidationError,
};

use crate::api::ApiResponse;
use crate::auth::handlers::UserInfo;
use crate::auth::password;
use crate::infra::app_state::AppState;
use crate::infra::errors::{AppError, AppResult};

#[derive(Debug, Clone, Deserialize)]
pub struct StatusRequest {
    pub status: UserStatus,
}

/// Filters plus pagination for the admin search view. Kept flat because
/// query strings arrive as plain key/value pairs.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub status: Option<UserStatus>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordResetRequest {
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignRolesRequest {
    pub role_ids: Vec<Uuid>,
}

/// GET /users?page=&size=
pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<PageRequest>,
) -> AppResult<Json<ApiResponse<PageResponse<UserInfo>>>> {
    let page = state.users.list(page.normalized()).await?;
    // The listing stays a single query; role codes are only resolved on the
    // detail endpoint.
    let page = page.map(summarize);

    Ok(Json(ApiResponse::success(page)))
}

fn summarize(user: servehub_core::user::User) -> UserInfo {
    UserInfo {
        id: user.audit.id,
        username: user.username,
        real_name: user.real_name,
        email: user.email,
        phone: user.phone,
        avatar: user.avatar,
        gender: user.gender,
        status: user.status,
        roles: Vec::new(),
        permissions: Vec::new(),
        last_login_at: user.last_login_at,
    }
}

/// GET /users/search?keyword=&status=&page=&size=
pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<ApiResponse<PageResponse<UserInfo>>>> {
    let filter = UserFilter {
        keyword: query.keyword,
        status: query.status,
    };
    let page = PageRequest {
        page: query.page.unwrap_or(1),
        size: query.size.unwrap_or(10),
    };

    let page = state.users.search(&filter, page.normalized()).await?;
    let page = page.map(summarize);

    Ok(Json(ApiResponse::success(page)))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<UserInfo>>> {
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let roles = state.roles.roles_for_user(id).await?;

    let mut info = summarize(user);
    info.roles = roles.into_iter().map(|r| r.code).collect();

    Ok(Json(ApiResponse::success(info)))
}

/// PUT /users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserUpdateRequest>,
) -> AppResult<Json<ApiResponse<UserInfo>>> {
    payload.validate()?;

    let mut user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if let Some(real_name) = payload.real_name {
        user.real_name = Some(real_name);
    }
    if let Some(email) = payload.email {
        user.email = Some(email);
    }
    if let Some(phone) = payload.phone {
        user.phone = Some(phone);
    }
    if let Some(avatar) = payload.avatar {
        user.avatar = Some(avatar);
    }
    if let Some(gender) = payload.gender {
        user.gender = gender;
    }
    if let Some(remark) = payload.remark {
        user.remark = Some(remark);
    }
    user.audit.touch();

    state.users.update(&user).await.map_err(map_contact_conflict)?;

    tracing::info!(user_id = %id, "user updated");

    Ok(Json(ApiResponse::success(summarize(user))))
}

/// PUT /users/{id}/password
///
/// Administrative reset; the caller sets the new plaintext directly, the
/// old password is not required.
pub async fn reset_password(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PasswordResetRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    if payload.password.len() < 6 {
        return Err(ValidationError::PasswordTooShort.into());
    }

    let mut user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    user.password_hash = password::hash(payload.password).await?;
    user.audit.touch();
    state.users.update(&user).await?;

    tracing::info!(user_id = %id, "password reset");

    Ok(Json(ApiResponse::success(())))
}

/// PUT /users/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let mut user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    user.status = payload.status;
    user.audit.touch();
    state.users.update(&user).await?;

    tracing::info!(user_id = %id, status = ?payload.status, "user status changed");

    Ok(Json(ApiResponse::success(())))
}

/// DELETE /users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    if state.users.find_by_id(id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    state.users.delete(id).await?;
    tracing::info!(user_id = %id, "user deleted");

    Ok(Json(ApiResponse::success(())))
}

/// PUT /users/{id}/roles
pub async fn assign_roles(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRolesRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    if state.users.find_by_id(id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    state.roles.assign_roles(id, &payload.role_ids).await?;
    tracing::info!(user_id = %id, roles = payload.role_ids.len(), "roles assigned");

    Ok(Json(ApiResponse::success(())))
}

/// GET /roles
pub async fn list_roles(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Role>>>> {
    let roles = state.roles.list().await?;
    Ok(Json(ApiResponse::success(roles)))
}

fn map_contact_conflict(err: CoreError) -> AppError {
    match err {
        CoreError::Conflict(ref field) => {
            AppError::conflict(format!("{field} already in use"))
        }
        other => other.into(),
    }
}
