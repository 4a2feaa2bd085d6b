//! User accounts and the request payloads that create and modify them.
//!
//! The password hash lives on the entity for repository round-trips but is
//! never serialized, so it cannot leak through an API response or a log line
//! that debug-prints a response body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::Audit;

/// Account status stored as a smallint, matching the store's `status` column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[repr(i16)]
pub enum UserStatus {
    Disabled = 0,
    Active = 1,
}

impl UserStatus {
    pub fn is_active(self) -> bool {
        matches!(self, UserStatus::Active)
    }
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Shared audit columns (id, timestamps, soft-delete, version)
    #[serde(flatten)]
    pub audit: Audit,
    /// Unique username (3-20 chars, alphanumeric + underscore)
    pub username: String,
    /// Argon2id password hash, never serialized
    #[serde(skip)]
    pub password_hash: String,
    /// Real name shown in admin views
    pub real_name: Option<String>,
    /// Unique email address
    pub email: Option<String>,
    /// Unique phone number
    pub phone: Option<String>,
    /// Avatar URL
    pub avatar: Option<String>,
    /// 0 = unknown, 1 = male, 2 = female
    pub gender: i16,
    /// Account status
    pub status: UserStatus,
    /// 1 = system user, 2 = regular user
    pub user_type: i16,
    /// Timestamp of the most recent successful login
    pub last_login_at: Option<DateTime<Utc>>,
    /// Source IP of the most recent successful login
    pub last_login_ip: Option<String>,
    /// Free-form admin note
    pub remark: Option<String>,
}

impl User {
    /// New regular account with sane defaults; the caller supplies an
    /// already-hashed password.
    pub fn new(username: String, password_hash: String) -> Self {
        Self {
            audit: Audit::new(),
            username,
            password_hash,
            real_name: None,
            email: None,
            phone: None,
            avatar: None,
            gender: 0,
            status: UserStatus::Active,
            user_type: 2,
            last_login_at: None,
            last_login_ip: None,
            remark: None,
        }
    }
}

/// Validation failures for inbound account payloads.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid username: must be 3-20 characters, alphanumeric or underscore")]
    InvalidUsername,

    #[error("Password too short: minimum 6 characters required")]
    PasswordTooShort,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Invalid phone number: up to 11 digits")]
    InvalidPhone,
}

/// Registration payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub real_name: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        validate_username(&self.username)?;

        if self.password.len() < 6 {
            return Err(ValidationError::PasswordTooShort);
        }

        if let Some(ref email) = self.email {
            // Full RFC validation belongs to the mail provider; reject the
            // obviously malformed.
            if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
                return Err(ValidationError::InvalidEmail);
            }
        }

        if let Some(ref phone) = self.phone {
            if phone.is_empty()
                || phone.len() > 11
                || !phone.chars().all(|c| c.is_ascii_digit())
            {
                return Err(ValidationError::InvalidPhone);
            }
        }

        Ok(())
    }
}

/// Login payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Profile update payload; absent fields are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserUpdateRequest {
    pub real_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub gender: Option<i16>,
    pub remark: Option<String>,
}

impl UserUpdateRequest {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if let Some(ref email) = self.email {
            if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
                return Err(ValidationError::InvalidEmail);
            }
        }

        if let Some(ref phone) = self.phone {
            if phone.is_empty()
                || phone.len() > 11
                || !phone.chars().all(|c| c.is_ascii_digit())
            {
                return Err(ValidationError::InvalidPhone);
            }
        }

        Ok(())
    }
}

/// Admin search criteria; absent filters match everything, present ones
/// combine with AND.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    /// Case-insensitive substring match against username, real name,
    /// email, and phone
    pub keyword: Option<String>,
    pub status: Option<UserStatus>,
}

fn validate_username(username: &str) -> std::result::Result<(), ValidationError> {
    // ASCII only, so byte length and character count agree.
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ValidationError::InvalidUsername);
    }

    if username.len() < 3 || username.len() > 20 {
        return Err(ValidationError::InvalidUsername);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
            email: None,
            phone: None,
            real_name: None,
        }
    }

    #[test]
    fn register_request_validation() {
        assert!(request("alice", "secret123").validate().is_ok());

        assert!(matches!(
            request("ab", "secret123").validate(),
            Err(ValidationError::InvalidUsername)
        ));
        assert!(matches!(
            request(&"a".repeat(21), "secret123").validate(),
            Err(ValidationError::InvalidUsername)
        ));
        assert!(matches!(
            request("ali ce", "secret123").validate(),
            Err(ValidationError::InvalidUsername)
        ));
        // Non-ASCII letters are outside the username alphabet, regardless
        // of how many bytes they occupy.
        assert!(matches!(
            request("用户名", "secret123").validate(),
            Err(ValidationError::InvalidUsername)
        ));
        assert!(matches!(
            request("alice", "short").validate(),
            Err(ValidationError::PasswordTooShort)
        ));
    }

    #[test]
    fn register_request_contact_validation() {
        let mut req = request("alice", "secret123");
        req.email = Some("not-an-email".to_string());
        assert!(matches!(req.validate(), Err(ValidationError::InvalidEmail)));

        let mut req = request("alice", "secret123");
        req.phone = Some("123456789012".to_string());
        assert!(matches!(req.validate(), Err(ValidationError::InvalidPhone)));

        let mut req = request("alice", "secret123");
        req.email = Some("alice@example.com".to_string());
        req.phone = Some("13800138000".to_string());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User::new("alice".to_string(), "$argon2id$hash".to_string());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password_hash"));
    }
}
