//! # Kakari API Server
//!
//! Task and project management backend.
//!
//! ## Usage
//!
//! ```bash
//! export JWT_SECRET_KEY=$(openssl rand -hex 32)
//! export JWT_REFRESH_SECRET_KEY=$(openssl rand -hex 32)
//! export BASE_URL=http://localhost:8080
//! cargo run -p kakari-api
//! ```
//!
//! Without `DATABASE_URL` the server keeps everything in memory.

use std::sync::Arc;

use anyhow::Context;
use kakari_api::{
    app::{build_router, AppState},
    config::Config,
};
use kakari_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, PoolSettings},
    },
    services::{
        mail::{HttpMailer, LogMailer, Mailer},
        Directories,
    },
    storage::{memory::MemoryStorage, postgres::PgStorage, Storage},
};
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "kakari_api=debug,kakari_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Kakari API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Failed to load configuration")?;

    let (storage, pool): (Arc<dyn Storage>, Option<PgPool>) = match &config.database {
        Some(database) => {
            let settings =
                PoolSettings::new(database.url.clone()).with_max_connections(database.max_connections);
            let pool = create_pool(&settings)
                .await
                .context("Failed to connect to database")?;
            run_migrations(&pool)
                .await
                .context("Failed to run migrations")?;
            let storage: Arc<dyn Storage> = Arc::new(PgStorage::new(pool.clone()));
            (storage, Some(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory storage");
            let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
            (storage, None)
        }
    };

    let mailer: Arc<dyn Mailer> = match &config.mail.api_url {
        Some(url) => Arc::new(
            HttpMailer::new(url.clone(), config.mail.api_token.clone(), config.mail.from.clone())
                .context("Failed to build mail client")?,
        ),
        None => {
            tracing::info!("MAIL_API_URL not set; emails will be logged");
            Arc::new(LogMailer)
        }
    };

    let directories = Directories::new(storage, mailer, config.user_settings());
    let bind_address = config.bind_address();
    let app = build_router(AppState::new(directories, config));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        close_pool(pool).await;
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
