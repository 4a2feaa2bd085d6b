//! Role-based access control.
//!
//! Users hold roles, roles hold permissions. At authentication time the
//! store resolves an [`AuthoritySet`]: the union of all permission codes
//! reachable through the user's active roles, plus the role codes themselves
//! carrying a `ROLE_` prefix so role checks and permission checks cannot
//! collide. Protected operations declare an [`AccessRequirement`] at route
//! registration time and the guard evaluates it against the authenticated
//! [`Identity`] before the handler runs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::Audit;
use crate::error::AuthError;
use crate::user::UserStatus;

/// Prefix distinguishing role codes from permission codes in an authority set.
pub const ROLE_PREFIX: &str = "ROLE_";

/// A named collection of permissions assignable to users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    #[serde(flatten)]
    pub audit: Audit,
    /// Unique role code (e.g. "ADMIN")
    pub code: String,
    /// Display name
    pub name: String,
    pub description: Option<String>,
    /// 0 = disabled, 1 = enabled; disabled roles grant nothing
    pub status: i16,
    pub sort_order: i32,
}

impl Role {
    pub fn is_enabled(&self) -> bool {
        self.status == 1
    }
}

/// What kind of UI or API surface a permission protects.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[repr(i16)]
#[serde(rename_all = "lowercase")]
pub enum PermissionType {
    Menu = 1,
    Button = 2,
    Api = 3,
}

/// A granular action that can be granted through roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    #[serde(flatten)]
    pub audit: Audit,
    /// Unique permission code (e.g. "system:user:list")
    pub code: String,
    /// Display name
    pub name: String,
    pub permission_type: PermissionType,
    pub description: Option<String>,
    /// 0 = disabled, 1 = enabled
    pub status: i16,
    pub sort_order: i32,
}

/// The complete authority set resolved for one authenticated request.
///
/// Contains permission codes as-is and role codes as `ROLE_<code>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthoritySet {
    codes: HashSet<String>,
}

impl AuthoritySet {
    /// Build from raw role codes and permission codes; role codes get the
    /// `ROLE_` prefix here so callers never have to remember it.
    pub fn from_codes<R, P>(role_codes: R, permission_codes: P) -> Self
    where
        R: IntoIterator<Item = String>,
        P: IntoIterator<Item = String>,
    {
        // The ROLE_ namespace is reserved for role markers. A permission
        // code that starts with it cannot be represented in the flat set
        // without impersonating a role, so it is dropped.
        let mut codes: HashSet<String> = permission_codes
            .into_iter()
            .filter(|code| !code.starts_with(ROLE_PREFIX))
            .collect();
        codes.extend(
            role_codes
                .into_iter()
                .map(|code| format!("{ROLE_PREFIX}{code}")),
        );
        Self { codes }
    }

    /// Role codes held, with the `ROLE_` prefix stripped.
    pub fn role_codes(&self) -> HashSet<&str> {
        self.codes
            .iter()
            .filter_map(|code| code.strip_prefix(ROLE_PREFIX))
            .collect()
    }

    /// Permission codes held (everything that is not a role marker).
    pub fn permission_codes(&self) -> HashSet<&str> {
        self.codes
            .iter()
            .filter(|code| !code.starts_with(ROLE_PREFIX))
            .map(String::as_str)
            .collect()
    }

    pub fn has_role(&self, role_code: &str) -> bool {
        self.codes.contains(&format!("{ROLE_PREFIX}{role_code}"))
    }

    pub fn has_permission(&self, permission_code: &str) -> bool {
        !permission_code.starts_with(ROLE_PREFIX) && self.codes.contains(permission_code)
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// The authenticated caller, resolved once per request and threaded through
/// the handler chain as an explicit extension value. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
    pub status: UserStatus,
    pub authorities: AuthoritySet,
}

/// How multiple required codes combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Logic {
    /// Caller must hold every required code.
    All,
    /// Caller must hold at least one required code.
    Any,
}

/// Whether a requirement names roles or permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequirementKind {
    Role,
    Permission,
}

/// Declarative access requirement attached to a protected operation.
///
/// Role codes are written without the `ROLE_` prefix; the prefix is an
/// authority-set encoding detail, not part of the declaration surface.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequirement {
    pub codes: &'static [&'static str],
    pub logic: Logic,
    pub kind: RequirementKind,
}

impl AccessRequirement {
    pub const fn roles(codes: &'static [&'static str], logic: Logic) -> Self {
        Self {
            codes,
            logic,
            kind: RequirementKind::Role,
        }
    }

    pub const fn permissions(codes: &'static [&'static str], logic: Logic) -> Self {
        Self {
            codes,
            logic,
            kind: RequirementKind::Permission,
        }
    }

    /// Decide whether the caller may proceed.
    ///
    /// No identity fails closed with `LoginRequired`. An empty requirement
    /// allows any authenticated caller. Denials distinguish the role case
    /// (`Forbidden`) from the permission case (`PermissionDenied`).
    pub fn evaluate(&self, identity: Option<&Identity>) -> Result<(), AuthError> {
        let identity = identity.ok_or(AuthError::LoginRequired)?;

        if self.codes.is_empty() {
            return Ok(());
        }

        let held: HashSet<&str> = match self.kind {
            RequirementKind::Role => identity.authorities.role_codes(),
            RequirementKind::Permission => identity.authorities.permission_codes(),
        };

        let satisfied = match self.logic {
            Logic::All => self.codes.iter().all(|code| held.contains(code)),
            Logic::Any => self.codes.iter().any(|code| held.contains(code)),
        };

        if satisfied {
            Ok(())
        } else {
            Err(match self.kind {
                RequirementKind::Role => AuthError::Forbidden,
                RequirementKind::Permission => AuthError::PermissionDenied,
            })
        }
    }
}

/// Well-known permission codes.
pub mod permissions {
    pub const USER_LIST: &str = "system:user:list";
    pub const USER_READ: &str = "system:user:read";
    pub const USER_CREATE: &str = "system:user:create";
    pub const USER_UPDATE: &str = "system:user:update";
    pub const USER_DELETE: &str = "system:user:delete";
    pub const USER_ASSIGN_ROLE: &str = "system:user:assign-role";
    pub const ROLE_LIST: &str = "system:role:list";
}

/// Well-known role codes.
pub mod roles {
    pub const ADMIN: &str = "ADMIN";
    pub const USER: &str = "USER";
}
