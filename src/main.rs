use std::{sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

mod app;
mod auth;
mod categories;
mod config;
mod error;
mod images;
mod products;
mod render;
mod state;
mod storage;
#[cfg(test)]
mod testing;
mod web;

use tower_sessions::ExpiredDeletion;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "storefront_admin=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;

    let sessions = app::session_store(db.clone());
    sessions.migrate().await.context("migrate session store")?;
    let expired = sessions.clone();
    tokio::spawn(async move {
        if let Err(e) = expired
            .continuously_delete_expired(Duration::from_secs(60 * 60))
            .await
        {
            tracing::error!(error = %e, "expired session cleanup stopped");
        }
    });

    let state = AppState::init(config, db).await?;
    app::serve(app::build_app(state, sessions)).await
}
