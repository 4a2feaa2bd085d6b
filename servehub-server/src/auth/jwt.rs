//! JWT issuance and validation.
//!
//! Access and refresh tokens share one signing secret but carry a `typ`
//! claim so one can never stand in for the other. Validation is pure
//! computation against the process-wide secret; there is no revocation
//! side-channel in this stateless design.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use serde::{Deserialize, Serialize};

use servehub_core::error::AuthError;

use crate::infra::config::Config;

/// Token type discriminator carried in the `typ` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by every ServeHub token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the authenticated subject
    pub sub: String,
    /// Issued-at (Unix seconds)
    pub iat: i64,
    /// Expiry (Unix seconds)
    pub exp: i64,
    /// Token type discriminator
    pub typ: TokenKind,
}

/// Stateless token service; one instance constructed at startup and shared
/// behind an `Arc`.
pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    pub fn new(secret: &str, access_ttl_secs: u64, refresh_ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::seconds(access_ttl_secs as i64),
            refresh_ttl: Duration::seconds(refresh_ttl_secs as i64),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.jwt_secret,
            config.jwt_access_ttl_secs,
            config.jwt_refresh_ttl_secs,
        )
    }

    /// Seconds an access token stays valid; reported as `expires_in`.
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Sign a token of the given kind for `username`.
    pub fn issue(
        &self,
        username: &str,
        kind: TokenKind,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };

        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            typ: kind,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Verify signature, expiry, and token type.
    pub fn validate(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            }
        })?;

        if data.claims.typ != expected {
            return Err(AuthError::TokenTypeMismatch);
        }

        Ok(data.claims)
    }

    /// Seconds until the token expires; zero once past expiry. The signature
    /// must still verify.
    pub fn remaining_lifetime(&self, token: &str) -> Result<i64, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;

        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| AuthError::TokenInvalid)?;

        Ok((data.claims.exp - Utc::now().timestamp()).max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret_key_for_testing_only";

    fn service() -> JwtService {
        JwtService::new(SECRET, 86_400, 604_800)
    }

    #[test]
    fn round_trip_recovers_subject() {
        let jwt = service();
        let token = jwt.issue("alice", TokenKind::Access).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let claims = jwt.validate(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.typ, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, 86_400);
    }

    #[test]
    fn token_types_are_isolated() {
        let jwt = service();

        let access = jwt.issue("alice", TokenKind::Access).unwrap();
        assert_eq!(
            jwt.validate(&access, TokenKind::Refresh),
            Err(AuthError::TokenTypeMismatch)
        );

        let refresh = jwt.issue("alice", TokenKind::Refresh).unwrap();
        assert_eq!(
            jwt.validate(&refresh, TokenKind::Access),
            Err(AuthError::TokenTypeMismatch)
        );
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let jwt = service();
        let now = Utc::now().timestamp();

        let claims = Claims {
            sub: "alice".to_string(),
            iat: now - 1_000,
            exp: now - 100,
            typ: TokenKind::Access,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            jwt.validate(&token, TokenKind::Access),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn wrong_secret_is_rejected_as_invalid() {
        let jwt = service();
        let other = JwtService::new("completely-different-secret", 86_400, 604_800);

        let token = other.issue("alice", TokenKind::Access).unwrap();
        assert_eq!(
            jwt.validate(&token, TokenKind::Access),
            Err(AuthError::TokenInvalid)
        );
    }

    #[test]
    fn garbage_token_is_invalid() {
        let jwt = service();
        assert_eq!(
            jwt.validate("not.a.token", TokenKind::Access),
            Err(AuthError::TokenInvalid)
        );
    }

    #[test]
    fn remaining_lifetime_is_bounded_and_non_negative() {
        let jwt = service();

        let token = jwt.issue("alice", TokenKind::Access).unwrap();
        let remaining = jwt.remaining_lifetime(&token).unwrap();
        assert!(remaining > 0);
        assert!(remaining <= 86_400);

        // A token past expiry reports zero, not an error.
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "alice".to_string(),
            iat: now - 1_000,
            exp: now - 100,
            typ: TokenKind::Access,
        };
        let expired = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert_eq!(jwt.remaining_lifetime(&expired).unwrap(), 0);
    }
}
