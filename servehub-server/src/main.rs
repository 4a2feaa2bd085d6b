use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

use servehub_core::postgres::{PostgresRoleRepository, PostgresUserRepository};
use servehub_server::infra::app_state::AppState;
use servehub_server::infra::config::Config;
use servehub_server::routes;

#[derive(Parser, Debug)]
#[command(name = "servehub-server", about = "ServeHub user and access management service")]
struct Cli {
    /// Override the listen host from the environment
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port from the environment
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=debug")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(host) = cli.host {
        config.server_host = host;
    }
    if let Some(port) = cli.port {
        config.server_port = port;
    }

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let users = Arc::new(PostgresUserRepository::new(pool.clone()));
    let roles = Arc::new(PostgresRoleRepository::new(pool));

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .context("invalid listen address")?;

    let cors = cors_layer(&config);
    let state = AppState::new(users, roles, config);

    let app = axum::Router::new()
        .nest("/api/v1", routes::create_v1_router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!(%addr, "servehub listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
