//! Authentication gateway: register, login, refresh, logout, and the
//! current-user endpoint.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use servehub_core::error::{AuthError, CoreError};
use servehub_core::rbac::Identity;
use servehub_core::user::{LoginRequest, RegisterRequest, User, UserStatus};

use crate::api::ApiResponse;
use crate::auth::jwt::TokenKind;
use crate::auth::password;
use crate::infra::app_state::AppState;
use crate::infra::errors::{AppError, AppResult};

/// Token pair plus account snapshot handed out by register, login, and
/// refresh.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access-token lifetime in seconds
    pub expires_in: i64,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Public view of an account; no credential material.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub username: String,
    pub real_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub gender: i16,
    pub status: UserStatus,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserInfo {
    fn from_parts(user: &User, roles: Vec<String>, permissions: Vec<String>) -> Self {
        Self {
            id: user.audit.id,
            username: user.username.clone(),
            real_name: user.real_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            avatar: user.avatar.clone(),
            gender: user.gender,
            status: user.status,
            roles,
            permissions,
            last_login_at: user.last_login_at,
        }
    }
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    payload.validate()?;

    // Pre-checks give friendly errors; the store's unique constraints catch
    // the race when two registrations pass these simultaneously.
    if state.users.exists_by_username(&payload.username).await? {
        return Err(AuthError::DuplicateUsername.into());
    }
    if let Some(ref email) = payload.email {
        if state.users.exists_by_email(email).await? {
            return Err(AuthError::DuplicateEmail.into());
        }
    }
    if let Some(ref phone) = payload.phone {
        if state.users.exists_by_phone(phone).await? {
            return Err(AuthError::DuplicatePhone.into());
        }
    }

    let password_hash = password::hash(payload.password).await?;

    let mut user = User::new(payload.username, password_hash);
    user.email = payload.email;
    user.phone = payload.phone;
    user.real_name = payload.real_name;

    state
        .users
        .save(&user)
        .await
        .map_err(map_registration_conflict)?;

    tracing::info!(username = %user.username, user_id = %user.audit.id, "user registered");

    // Fresh accounts hold no roles yet, so the snapshot carries empty
    // authority lists.
    let snapshot = UserInfo::from_parts(&user, Vec::new(), Vec::new());
    let tokens = issue_pair(&state, &user.username, snapshot)?;

    Ok(Json(ApiResponse::success(tokens)))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    // Unknown username and wrong password take the same path out so the
    // response cannot be used to enumerate accounts.
    let user = state
        .users
        .find_by_username(&payload.username)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let verified = password::verify(payload.password, user.password_hash.clone()).await?;
    if !verified {
        return Err(AuthError::InvalidCredentials.into());
    }

    // A disabled account reads exactly like bad credentials at login, so
    // the response cannot reveal account status either.
    if !user.status.is_active() {
        return Err(AuthError::InvalidCredentials.into());
    }

    let snapshot = snapshot_with_authorities(&state, &user).await?;
    let tokens = issue_pair(&state, &user.username, snapshot)?;

    // Best effort; a failed bookkeeping write must not fail the login.
    if let Err(err) = state
        .users
        .update_last_login(user.audit.id, Utc::now(), Some(addr.ip().to_string()))
        .await
    {
        tracing::warn!(error = %err, username = %user.username, "failed to record last login");
    }

    tracing::info!(username = %user.username, "user logged in");

    Ok(Json(ApiResponse::success(tokens)))
}

/// POST /auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    let claims = state
        .jwt
        .validate(&payload.refresh_token, TokenKind::Refresh)?;

    // The account must still exist and be active at refresh time.
    let user = state
        .users
        .find_by_username(&claims.sub)
        .await?
        .ok_or(AuthError::TokenInvalid)?;

    if !user.status.is_active() {
        return Err(AuthError::UserDisabled.into());
    }

    // Both tokens are re-issued; the old refresh token is not tracked and
    // simply ages out at its own expiry.
    let snapshot = snapshot_with_authorities(&state, &user).await?;
    let tokens = issue_pair(&state, &user.username, snapshot)?;

    Ok(Json(ApiResponse::success(tokens)))
}

/// POST /auth/logout
///
/// Tokens are stateless, so there is nothing to revoke server-side. The
/// endpoint exists so clients have a uniform logout call and an audit line
/// is written.
pub async fn logout(
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<ApiResponse<()>>> {
    tracing::info!(username = %identity.username, "user logged out");
    Ok(Json(ApiResponse::success(())))
}

/// GET /auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<ApiResponse<UserInfo>>> {
    let user = state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let roles = identity
        .authorities
        .role_codes()
        .into_iter()
        .map(String::from)
        .collect();
    let permissions = identity
        .authorities
        .permission_codes()
        .into_iter()
        .map(String::from)
        .collect();

    Ok(Json(ApiResponse::success(UserInfo::from_parts(
        &user,
        roles,
        permissions,
    ))))
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Per-field availability; `true` means the value is free to register.
/// Fields absent from the query are absent from the answer.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<bool>,
}

/// GET /auth/availability
///
/// Pre-registration uniqueness check for signup forms. Intentionally
/// public, like registration itself.
pub async fn availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<ApiResponse<AvailabilityResponse>>> {
    let username = match query.username {
        Some(ref username) => Some(!state.users.exists_by_username(username).await?),
        None => None,
    };
    let email = match query.email {
        Some(ref email) => Some(!state.users.exists_by_email(email).await?),
        None => None,
    };
    let phone = match query.phone {
        Some(ref phone) => Some(!state.users.exists_by_phone(phone).await?),
        None => None,
    };

    Ok(Json(ApiResponse::success(AvailabilityResponse {
        username,
        email,
        phone,
    })))
}

fn issue_pair(
    state: &AppState,
    username: &str,
    user: UserInfo,
) -> Result<AuthResponse, AppError> {
    let access_token = state
        .jwt
        .issue(username, TokenKind::Access)
        .map_err(|e| AppError::internal(format!("token signing failed: {e}")))?;
    let refresh_token = state
        .jwt
        .issue(username, TokenKind::Refresh)
        .map_err(|e| AppError::internal(format!("token signing failed: {e}")))?;

    Ok(AuthResponse {
        access_token,
        refresh_token,
        token_type: "Bearer",
        expires_in: state.jwt.access_ttl_secs(),
        user,
    })
}

async fn snapshot_with_authorities(
    state: &AppState,
    user: &User,
) -> Result<UserInfo, AppError> {
    let authorities = state.roles.authority_set_for_user(user.audit.id).await?;
    let roles = authorities
        .role_codes()
        .into_iter()
        .map(String::from)
        .collect();
    let permissions = authorities
        .permission_codes()
        .into_iter()
        .map(String::from)
        .collect();
    Ok(UserInfo::from_parts(user, roles, permissions))
}

/// Translate a constraint-level conflict into the precise duplicate error.
fn map_registration_conflict(err: CoreError) -> AppError {
    match err {
        CoreError::Conflict(ref field) => match field.as_str() {
            "username" => AuthError::DuplicateUsername.into(),
            "email" => AuthError::DuplicateEmail.into(),
            "phone" => AuthError::DuplicatePhone.into(),
            _ => err.into(),
        },
        other => other.into(),
    }
}
