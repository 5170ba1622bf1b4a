//! EGA Bank API Server
//!
//! Main entry point for the EGA Bank back-end.

use std::sync::Arc;

use anyhow::Context;
use sea_orm_migration::MigratorTrait;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use egabank_api::{AppState, create_router};
use egabank_core::store::{MemoryStore, Store};
use egabank_db::{PgStore, connect, migration::Migrator};
use egabank_shared::AppConfig;
use egabank_shared::jwt::{JwtConfig, JwtService};

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    if config.database.is_memory() {
        warn!("using the in-memory store; data is lost on shutdown");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let db = connect(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await
    .context("failed to connect to database")?;
    info!("Connected to database");

    Migrator::up(&db, None).await.context("failed to run migrations")?;
    info!("Migrations applied");

    Ok(Arc::new(PgStore::new(db)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "egabank=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    let store = open_store(&config).await?;
    let jwt = Arc::new(JwtService::new(JwtConfig::from(&config.jwt)));
    let state = AppState::new(store, jwt);

    if let Some(bootstrap) = &config.bootstrap {
        let created = state
            .auth
            .bootstrap_admin(
                &bootstrap.admin_username,
                &bootstrap.admin_email,
                &bootstrap.admin_password,
            )
            .await
            .context("failed to create the administrator")?;
        if created {
            info!(username = %bootstrap.admin_username, "bootstrap administrator created");
        }
    }

    let app = create_router(state);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
