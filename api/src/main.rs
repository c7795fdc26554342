use anyhow::{Context, Result};
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::time::Duration;

use api::config::{AppConfig, Environment};
use api::db::PgStore;
use api::migration_cli;
use api::observability::Observability;
use api::server::build_app;
use api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    let obs = Observability::init(Environment::parse(std::env::var("APP_ENV").ok()))?;

    let config = AppConfig::from_env().context("Invalid configuration")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let migration_command = migration_cli::parse_command(&args)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(config.database.connect_options()?)
        .await
        .context("Failed to connect to the database")?;

    // Run migrations by default, or execute migration subcommands.
    if let Some(command) = migration_command {
        migration_cli::execute(command, &pool).await?;
        return Ok(());
    }

    sqlx::migrate!("../database/migrations")
        .run(&pool)
        .await
        .context("Failed to apply migrations")?;

    tracing::info!("Database connected and migrations applied");

    let port = config.port;
    let environment = config.environment;
    let state = AppState::with_pg(PgStore::new(pool), config, obs.registry);
    let app = build_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %environment, "API server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
