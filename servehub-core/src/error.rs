use thiserror::Error;

/// Store-level failures surfaced by the repository ports.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => CoreError::NotFound("row not found".to_string()),
            other => CoreError::Database(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Authentication and authorization failures.
///
/// Each variant carries a stable numeric code so clients can branch on
/// machine-readable identifiers instead of message text. Unknown-user and
/// wrong-password cases deliberately share `InvalidCredentials` so login
/// responses cannot be used to enumerate accounts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Phone number already exists")]
    DuplicatePhone,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token type mismatch")]
    TokenTypeMismatch,

    #[error("Login required")]
    LoginRequired,

    #[error("Access forbidden")]
    Forbidden,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("User account is disabled")]
    UserDisabled,
}

impl AuthError {
    /// Stable error code reported in API envelopes.
    pub fn code(&self) -> u16 {
        match self {
            AuthError::InvalidCredentials => 9106,
            AuthError::DuplicateUsername => 9103,
            AuthError::DuplicateEmail => 9104,
            AuthError::DuplicatePhone => 9105,
            AuthError::TokenInvalid => 9202,
            AuthError::TokenExpired => 9203,
            AuthError::TokenTypeMismatch => 9205,
            AuthError::LoginRequired => 9204,
            AuthError::Forbidden => 9003,
            AuthError::PermissionDenied => 9201,
            AuthError::UserDisabled => 9107,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_messages() {
        let cases = vec![
            (AuthError::InvalidCredentials, "Invalid username or password"),
            (AuthError::DuplicateUsername, "Username already exists"),
            (AuthError::DuplicateEmail, "Email already exists"),
            (AuthError::DuplicatePhone, "Phone number already exists"),
            (AuthError::TokenInvalid, "Invalid token"),
            (AuthError::TokenExpired, "Token expired"),
            (AuthError::TokenTypeMismatch, "Token type mismatch"),
            (AuthError::LoginRequired, "Login required"),
            (AuthError::Forbidden, "Access forbidden"),
            (AuthError::PermissionDenied, "Permission denied"),
            (AuthError::UserDisabled, "User account is disabled"),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn auth_error_codes_are_distinct() {
        let all = [
            AuthError::InvalidCredentials,
            AuthError::DuplicateUsername,
            AuthError::DuplicateEmail,
            AuthError::DuplicatePhone,
            AuthError::TokenInvalid,
            AuthError::TokenExpired,
            AuthError::TokenTypeMismatch,
            AuthError::LoginRequired,
            AuthError::Forbidden,
            AuthError::PermissionDenied,
            AuthError::UserDisabled,
        ];

        let mut codes: Vec<u16> = all.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }
}
