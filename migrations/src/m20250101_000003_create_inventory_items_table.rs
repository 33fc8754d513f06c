use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InventoryItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryItems::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(InventoryItems::WarehouseId).uuid().not_null())
                    .col(
                        ColumnDef::new(InventoryItems::Name)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryItems::Sku).string_len(100).not_null())
                    .col(ColumnDef::new(InventoryItems::Description).string_len(500))
                    .col(
                        ColumnDef::new(InventoryItems::Quantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::BuyPrice)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::SellPrice)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(InventoryItems::Category).string_len(50))
                    .col(
                        ColumnDef::new(InventoryItems::MinStockLevel)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .check(Expr::col(InventoryItems::Quantity).gte(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_items_warehouse")
                            .from(InventoryItems::Table, InventoryItems::WarehouseId)
                            .to(Warehouses::Table, Warehouses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_items_sku")
                    .table(InventoryItems::Table)
                    .col(InventoryItems::Sku)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Warehouse-scoped listings and stats
        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_items_warehouse_id")
                    .table(InventoryItems::Table)
                    .col(InventoryItems::WarehouseId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_items_category")
                    .table(InventoryItems::Table)
                    .col(InventoryItems::Category)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum InventoryItems {
    Table,
    Id,
    WarehouseId,
    Name,
    Sku,
    Description,
    Quantity,
    BuyPrice,
    SellPrice,
    Category,
    MinStockLevel,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Warehouses {
    Table,
    Id,
}
