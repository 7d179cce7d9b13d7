//! sourcehub server — application entry point.

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use sourcehub_db::{DbConfig, DbManager};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("sourcehub=info".parse().expect("static directive")),
        )
        .json()
        .init();

    tracing::info!("Starting sourcehub server...");

    let config = DbConfig::from_env();
    let manager = match DbManager::connect(&config).await {
        Ok(manager) => manager,
        Err(error) => {
            tracing::error!(%error, "failed to connect to SurrealDB");
            return ExitCode::FAILURE;
        }
    };

    if let Err(error) = sourcehub_db::run_migrations(manager.client()).await {
        tracing::error!(%error, "schema migration failed");
        return ExitCode::FAILURE;
    }

    tracing::info!("sourcehub server ready");

    // TODO: mount the REST surface once the HTTP layer lands.
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        return ExitCode::FAILURE;
    }

    tracing::info!("sourcehub server stopped.");
    ExitCode::SUCCESS
}
