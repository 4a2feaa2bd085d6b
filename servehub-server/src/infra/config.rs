use std::env;

use serde::Deserialize;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server settings
    pub server_host: String,
    pub server_port: u16,

    // Database settings
    pub database_url: String,

    // Token settings
    pub jwt_secret: String,
    /// Access-token lifetime in seconds (default 24h)
    pub jwt_access_ttl_secs: u64,
    /// Refresh-token lifetime in seconds (default 7 days)
    pub jwt_refresh_ttl_secs: u64,
    /// Header the bearer token arrives in
    pub auth_header: String,
    /// Prefix stripped from the header value
    pub auth_token_prefix: String,

    // CORS settings
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?;

        Ok(Self {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),

            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,

            jwt_secret,
            jwt_access_ttl_secs: env::var("JWT_ACCESS_TTL_SECS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .unwrap_or(86_400),
            jwt_refresh_ttl_secs: env::var("JWT_REFRESH_TTL_SECS")
                .unwrap_or_else(|_| "604800".to_string())
                .parse()
                .unwrap_or(604_800),
            auth_header: env::var("AUTH_HEADER")
                .unwrap_or_else(|_| "Authorization".to_string()),
            auth_token_prefix: env::var("AUTH_TOKEN_PREFIX")
                .unwrap_or_else(|_| "Bearer ".to_string()),

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
        })
    }
}
