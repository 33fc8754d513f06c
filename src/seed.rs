//! Bootstrap data: the initial super admin and an optional demo catalogue.

use crate::{
    auth::{password::hash_password, policy::WarehouseScope},
    config::AppConfig,
    entities::{user, User, UserModel, UserRole, Warehouse},
    errors::ServiceError,
    services::{
        inventory::{CreateInventoryRequest, InventoryService},
        warehouses::{CreateWarehouseRequest, WarehouseService},
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// What a seeding run created
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub admin_created: bool,
    pub warehouses_created: usize,
    pub items_created: usize,
}

const DEMO_WAREHOUSES: [(&str, &str, &str); 3] = [
    (
        "Main Warehouse Jakarta",
        "Jakarta, Indonesia",
        "Primary warehouse for Jakarta region",
    ),
    (
        "Warehouse Surabaya",
        "Surabaya, Indonesia",
        "Eastern Java distribution center",
    ),
    (
        "Warehouse Bandung",
        "Bandung, Indonesia",
        "West Java regional warehouse",
    ),
];

struct DemoItem {
    name: &'static str,
    sku_prefix: &'static str,
    description: &'static str,
    quantity: i32,
    buy_price: Decimal,
    sell_price: Decimal,
    category: &'static str,
    min_stock_level: i32,
}

fn demo_items() -> [DemoItem; 5] {
    [
        DemoItem {
            name: "Laptop Dell XPS 15",
            sku_prefix: "LAP-DELL-XPS15",
            description: "15-inch high-performance laptop",
            quantity: 50,
            buy_price: dec!(15000000),
            sell_price: dec!(18000000),
            category: "Electronics",
            min_stock_level: 10,
        },
        DemoItem {
            name: "Office Chair Ergonomic",
            sku_prefix: "CHR-ERG-001",
            description: "Comfortable ergonomic office chair",
            quantity: 120,
            buy_price: dec!(1500000),
            sell_price: dec!(2000000),
            category: "Furniture",
            min_stock_level: 20,
        },
        // Starts below its minimum so the low stock figures have something to show
        DemoItem {
            name: "Wireless Mouse Logitech",
            sku_prefix: "MSE-LOG-WRL",
            description: "Wireless optical mouse",
            quantity: 3,
            buy_price: dec!(250000),
            sell_price: dec!(350000),
            category: "Electronics",
            min_stock_level: 50,
        },
        DemoItem {
            name: "Standing Desk",
            sku_prefix: "DSK-STD-001",
            description: "Adjustable height standing desk",
            quantity: 40,
            buy_price: dec!(3500000),
            sell_price: dec!(5000000),
            category: "Furniture",
            min_stock_level: 10,
        },
        DemoItem {
            name: "Desk Lamp LED",
            sku_prefix: "LMP-DSK-LED",
            description: "Adjustable LED desk lamp",
            quantity: 150,
            buy_price: dec!(300000),
            sell_price: dec!(500000),
            category: "Office Supplies",
            min_stock_level: 40,
        },
    ]
}

/// Creates the configured super admin unless a user with that email exists.
/// Returns the account and whether it was created by this call.
pub async fn ensure_super_admin(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
) -> Result<(UserModel, bool), ServiceError> {
    let email = email.trim().to_string();

    if let Some(existing) = User::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
    {
        if existing.role != UserRole::SuperAdmin {
            warn!(email = %email, "Seed admin email belongs to a non-admin account");
        }
        return Ok((existing, false));
    }

    let now = Utc::now();
    let admin = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Super Admin".to_string()),
        email: Set(email.clone()),
        password_hash: Set(hash_password(password)?),
        role: Set(UserRole::SuperAdmin),
        warehouse_id: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(ServiceError::db_error)?;

    info!(email = %email, "Super admin created; change the default password after first login");
    Ok((admin, true))
}

/// Demo warehouses with a few items each, only when no warehouse exists yet.
/// Goes through the regular services so every row gets its activity entry.
pub async fn seed_demo_catalogue(
    db: Arc<DatabaseConnection>,
    actor_id: Uuid,
) -> Result<(usize, usize), ServiceError> {
    let existing = Warehouse::find()
        .count(&*db)
        .await
        .map_err(ServiceError::db_error)?;
    if existing > 0 {
        info!(existing, "Warehouses already present; skipping demo catalogue");
        return Ok((0, 0));
    }

    let warehouses = WarehouseService::new(db.clone());
    let inventory = InventoryService::new(db);
    let mut items_created = 0;

    for (idx, (name, location, description)) in DEMO_WAREHOUSES.iter().enumerate() {
        let warehouse = warehouses
            .create(
                actor_id,
                CreateWarehouseRequest {
                    name: name.to_string(),
                    location: location.to_string(),
                    description: Some(description.to_string()),
                },
            )
            .await?;

        for item in demo_items() {
            inventory
                .create(
                    actor_id,
                    WarehouseScope::All,
                    CreateInventoryRequest {
                        warehouse_id: warehouse.id,
                        name: item.name.to_string(),
                        sku: format!("{}-W{:02}", item.sku_prefix, idx + 1),
                        description: Some(item.description.to_string()),
                        quantity: item.quantity,
                        buy_price: item.buy_price,
                        sell_price: item.sell_price,
                        category: Some(item.category.to_string()),
                        min_stock_level: item.min_stock_level,
                    },
                )
                .await?;
            items_created += 1;
        }
    }

    Ok((DEMO_WAREHOUSES.len(), items_created))
}

/// Idempotent bootstrap: the admin always, the demo catalogue on request
pub async fn seed_database(
    db: Arc<DatabaseConnection>,
    cfg: &AppConfig,
    with_demo_data: bool,
) -> Result<SeedSummary, ServiceError> {
    let (admin, admin_created) =
        ensure_super_admin(&db, &cfg.seed_admin_email, &cfg.seed_admin_password).await?;

    let mut summary = SeedSummary {
        admin_created,
        ..Default::default()
    };

    if with_demo_data {
        let (warehouses, items) = seed_demo_catalogue(db, admin.id).await?;
        summary.warehouses_created = warehouses;
        summary.items_created = items;
    }

    info!(
        admin_created = summary.admin_created,
        warehouses = summary.warehouses_created,
        items = summary.items_created,
        "Seeding finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::password::verify_password, db};
    use migrations::{Migrator, MigratorTrait};
    use sea_orm::{ConnectOptions, Database};

    async fn fresh_db() -> Arc<DatabaseConnection> {
        // One connection so every query sees the same in-memory database
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).min_connections(1);
        let conn = Database::connect(options).await.unwrap();
        Migrator::up(&conn, None).await.unwrap();
        Arc::new(conn)
    }

    fn config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "a-long-enough-test-secret-for-jwt-signing".into(),
            60,
            "127.0.0.1".into(),
            0,
            "test".into(),
        )
    }

    #[tokio::test]
    async fn admin_is_created_once() {
        let db = fresh_db().await;
        let cfg = config();

        let first = seed_database(db.clone(), &cfg, false).await.unwrap();
        assert!(first.admin_created);
        let second = seed_database(db.clone(), &cfg, false).await.unwrap();
        assert!(!second.admin_created);

        let admins = User::find().all(&*db).await.unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].role, UserRole::SuperAdmin);
        assert!(verify_password(&cfg.seed_admin_password, &admins[0].password_hash));
        db::check_connection(&db).await.unwrap();
    }

    #[tokio::test]
    async fn demo_catalogue_is_skipped_when_warehouses_exist() {
        let db = fresh_db().await;
        let cfg = config();

        let first = seed_database(db.clone(), &cfg, true).await.unwrap();
        assert_eq!(first.warehouses_created, DEMO_WAREHOUSES.len());
        assert_eq!(first.items_created, DEMO_WAREHOUSES.len() * demo_items().len());

        let second = seed_database(db.clone(), &cfg, true).await.unwrap();
        assert_eq!(second, SeedSummary::default());
    }
}
