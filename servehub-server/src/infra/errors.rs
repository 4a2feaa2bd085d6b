use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;

use servehub_core::error::{AuthError, CoreError};
use servehub_core::user::ValidationError;

use crate::api::ApiResponse;

pub type AppResult<T> = Result<T, AppError>;

/// HTTP-facing error: a status, a stable numeric code for the envelope, and
/// a message safe to show the caller. Storage errors never pass through
/// verbatim.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: u16,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, 9000, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, 9001, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, 9004, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, 9302, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, 9006, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ApiResponse::<()>::error(self.code, self.message));
        (self.status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let status = match err {
            AuthError::InvalidCredentials
            | AuthError::TokenInvalid
            | AuthError::TokenExpired
            | AuthError::TokenTypeMismatch
            | AuthError::LoginRequired => StatusCode::UNAUTHORIZED,

            AuthError::Forbidden
            | AuthError::PermissionDenied
            | AuthError::UserDisabled => StatusCode::FORBIDDEN,

            AuthError::DuplicateUsername
            | AuthError::DuplicateEmail
            | AuthError::DuplicatePhone => StatusCode::CONFLICT,
        };

        Self::new(status, err.code(), err.to_string())
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => Self::not_found(msg),
            CoreError::Conflict(msg) => Self::conflict(msg),
            CoreError::Validation(msg) => Self::validation(msg),
            CoreError::Database(_) | CoreError::Internal(_) => {
                tracing::error!(error = %err, "storage operation failed");
                Self::internal("Internal server error")
            }
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = %err, "unhandled internal error");
        Self::internal("Internal server error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_expected_status() {
        let unauthorized = AppError::from(AuthError::LoginRequired);
        assert_eq!(unauthorized.status, StatusCode::UNAUTHORIZED);
        assert_eq!(unauthorized.code, 9204);

        let forbidden = AppError::from(AuthError::PermissionDenied);
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
        assert_eq!(forbidden.code, 9201);

        let conflict = AppError::from(AuthError::DuplicateUsername);
        assert_eq!(conflict.status, StatusCode::CONFLICT);
        assert_eq!(conflict.code, 9103);
    }

    #[test]
    fn storage_errors_are_not_leaked() {
        let err = AppError::from(CoreError::Database(
            "connection refused: 10.0.0.3:5432".to_string(),
        ));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("10.0.0.3"));
    }
}
