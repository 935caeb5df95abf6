//! Skillbook maintenance run
//!
//! Connects to the configured database, applies pending migrations and
//! expires overdue skill cards.

use anyhow::Result;
use chrono::Local;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skillbook::{
    config::Config,
    db::{
        self,
        repositories::{SqlxCertificationRepository, SqlxSkillCardRepository},
    },
    services::{CatalogService, SkillCardService},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skillbook=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed ({} applied)", applied);

    let catalog = Arc::new(CatalogService::new(SqlxCertificationRepository::boxed(pool.clone())));
    let lifecycle = SkillCardService::new(
        SqlxSkillCardRepository::boxed(pool.clone()),
        catalog,
        &config.lifecycle,
    );

    let today = Local::now().date_naive();
    let expired = lifecycle.expire_overdue(today).await?;
    if expired.is_empty() {
        tracing::info!("No overdue skill cards on {}", today);
    } else {
        tracing::info!("Expired skill cards on {}: {:?}", today, expired);
    }

    pool.close().await;
    Ok(())
}
