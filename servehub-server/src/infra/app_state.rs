use std::{fmt, sync::Arc};

use servehub_core::ports::{RoleRepository, UserRepository};

use crate::auth::jwt::JwtService;
use crate::infra::config::Config;

/// Shared application state cloned into every handler.
///
/// Repositories are read-mostly trait objects; the token service and config
/// are immutable after startup, so requests never contend on locks.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub jwt: Arc<JwtService>,
    pub config: Arc<Config>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserRepository>,
        roles: Arc<dyn RoleRepository>,
        config: Config,
    ) -> Self {
        let jwt = Arc::new(JwtService::from_config(&config));
        Self {
            users,
            roles,
            jwt,
            config: Arc::new(config),
        }
    }
}
