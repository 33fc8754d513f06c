//! Schema management for the inventory database
//!
//! Run with: cargo run --bin migration -- up

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use migrations::{Migrator, MigratorTrait};
use tracing::info;

use inventory_api::{config, db};

#[derive(Parser)]
#[command(name = "migration", about = "Apply or roll back inventory schema migrations", version)]
struct Cli {
    #[arg(long, help = "Database URL; defaults to the configured database_url")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending migrations (default)
    Up {
        #[arg(long, help = "Apply at most this many migrations")]
        steps: Option<u32>,
    },
    /// Roll back applied migrations
    Down {
        #[arg(long, default_value_t = 1, help = "Number of migrations to roll back")]
        steps: u32,
    },
    /// Show applied and pending migrations
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    let database_url = match cli.database_url {
        Some(url) => url,
        None => config::load_config()
            .context("no --database-url given and configuration failed to load")?
            .database_url,
    };

    info!("Connecting to database: {}", database_url);
    let conn = db::establish_connection(&database_url)
        .await
        .context("database connection failed")?;

    match cli.command.unwrap_or(Command::Up { steps: None }) {
        Command::Up { steps } => {
            Migrator::up(&conn, steps).await?;
            info!("Migrations applied");
        }
        Command::Down { steps } => {
            Migrator::down(&conn, Some(steps)).await?;
            info!(steps, "Migrations rolled back");
        }
        Command::Status => {
            for name in Migrator::get_applied_migrations(&conn).await? {
                info!("applied: {}", name.name());
            }
            for name in Migrator::get_pending_migrations(&conn).await? {
                info!("pending: {}", name.name());
            }
        }
    }

    Ok(())
}
