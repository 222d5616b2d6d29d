use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tracing::info;

mod accounts;
mod config;
mod dashboard;
mod db;
mod model;

use accounts::Accounts;
use config::Config;
use dashboard::AppState;
use db::Database;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    info!(
        "Model constants: form_weight={}, home_advantage={}, min_lambda={}, max_goals={}",
        config.form_weight, config.home_advantage, config.min_lambda, config.max_goals
    );

    // Open database and seed the sample team catalogue on first run
    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);
    db.seed_sample_teams()?;

    let state = AppState {
        db: db.clone(),
        accounts: Accounts::new(db),
        params: config.model_params(),
        max_goals: config.max_goals,
    };
    let app = dashboard::router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    info!("Dashboard listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
