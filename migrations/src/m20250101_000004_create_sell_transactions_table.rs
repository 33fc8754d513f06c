use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Warehouse and item ids carry no foreign keys: sales history outlives
        // the rows it refers to.
        manager
            .create_table(
                Table::create()
                    .table(SellTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SellTransactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SellTransactions::WarehouseId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SellTransactions::InventoryItemId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SellTransactions::UserId).uuid().null())
                    .col(
                        ColumnDef::new(SellTransactions::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SellTransactions::UnitPrice)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SellTransactions::TotalPrice)
                            .decimal_len(14, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SellTransactions::Description).string_len(500))
                    .col(
                        ColumnDef::new(SellTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .check(Expr::col(SellTransactions::Quantity).gt(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sell_transactions_user")
                            .from(SellTransactions::Table, SellTransactions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sell_transactions_warehouse_created")
                    .table(SellTransactions::Table)
                    .col(SellTransactions::WarehouseId)
                    .col((SellTransactions::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sell_transactions_item_created")
                    .table(SellTransactions::Table)
                    .col(SellTransactions::InventoryItemId)
                    .col((SellTransactions::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SellTransactions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SellTransactions {
    Table,
    Id,
    WarehouseId,
    InventoryItemId,
    UserId,
    Quantity,
    UnitPrice,
    TotalPrice,
    Description,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
