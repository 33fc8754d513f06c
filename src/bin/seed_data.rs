//! Seed data script - creates the super admin plus a demo catalogue
//!
//! Run with: cargo run --bin seed-data
//!
//! This creates:
//! - the configured super admin, if missing
//! - 3 warehouses with 5 inventory items each, if no warehouse exists

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use inventory_api::{config, db, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("=== Inventory API Seed Data ===");

    let cfg = config::load_config().context("configuration failed to load")?;
    let pool = db::establish_connection_from_app_config(&cfg).await?;
    db::run_migrations(&pool).await?;

    let summary = seed::seed_database(Arc::new(pool), &cfg, true).await?;

    info!("=== Seed Data Complete ===");
    if summary.admin_created {
        info!("Super admin: {} (change the password after first login)", cfg.seed_admin_email);
    }
    info!(
        "Created {} warehouses and {} inventory items",
        summary.warehouses_created, summary.items_created
    );
    info!("Explore interactively at: http://localhost:{}/swagger-ui", cfg.port);

    Ok(())
}
