use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Audit trail entry.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "activities")]
#[schema(as = Activity)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(nullable)]
    pub user_id: Option<Uuid>,
    pub activity_type: ActivityType,
    pub entity_type: String,
    #[sea_orm(nullable)]
    pub entity_id: Option<Uuid>,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Json", nullable)]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Json>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(50))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityType {
    #[sea_orm(string_value = "inventory_created")]
    InventoryCreated,
    #[sea_orm(string_value = "inventory_updated")]
    InventoryUpdated,
    #[sea_orm(string_value = "inventory_deleted")]
    InventoryDeleted,
    #[sea_orm(string_value = "inventory_stock_adjusted")]
    InventoryStockAdjusted,
    #[sea_orm(string_value = "warehouse_created")]
    WarehouseCreated,
    #[sea_orm(string_value = "warehouse_updated")]
    WarehouseUpdated,
    #[sea_orm(string_value = "warehouse_deleted")]
    WarehouseDeleted,
    #[sea_orm(string_value = "sell_transaction")]
    SellTransaction,
    #[sea_orm(string_value = "user_login")]
    UserLogin,
    #[sea_orm(string_value = "user_created")]
    UserCreated,
    #[sea_orm(string_value = "user_updated")]
    UserUpdated,
    #[sea_orm(string_value = "user_deleted")]
    UserDeleted,
}
