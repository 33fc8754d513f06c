use crate::{
    auth::policy::WarehouseScope,
    entities::{
        inventory_item, sell_transaction, ActivityType, InventoryItem, SellTransaction,
        SellTransactionModel, UserRole, Warehouse,
    },
    errors::ServiceError,
    services::activity::{entity_types, log_activity, NewActivity},
};
use chrono::Utc;
use metrics::{counter, histogram};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_SALES_PAGE: u64 = 100;
pub const MAX_SALES_PAGE: u64 = 1000;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSaleRequest {
    pub warehouse_id: Uuid,
    pub inventory_item_id: Uuid,
    /// Units to sell, at least 1
    #[validate(range(min = 1, message = "Quantity must be greater than 0"))]
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

/// Stock levels around one sale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    pub previous: i32,
    pub new: i32,
}

impl StockChange {
    pub fn delta(&self) -> i32 {
        self.new - self.previous
    }
}

fn insufficient_stock(available: i32, requested: i32) -> ServiceError {
    ServiceError::InsufficientStock(format!(
        "Insufficient stock. Available: {}, Requested: {}",
        available, requested
    ))
}

/// Works out the stock after selling `requested` units out of `available`.
/// Never yields a negative level.
pub fn plan_sale(available: i32, requested: i32) -> Result<StockChange, ServiceError> {
    if requested <= 0 {
        return Err(ServiceError::ValidationError(
            "Quantity must be greater than 0".to_string(),
        ));
    }
    if available < requested {
        return Err(insufficient_stock(available, requested));
    }
    Ok(StockChange {
        previous: available,
        new: available - requested,
    })
}

/// `unit_price × quantity`, refusing totals `Decimal` cannot represent
pub fn sale_total(unit_price: Decimal, quantity: i32) -> Result<Decimal, ServiceError> {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(|| ServiceError::BadRequest("Sale total exceeds the supported range".to_string()))
}

/// Sell transactions: the only path that draws stock down
#[derive(Clone)]
pub struct SalesService {
    db: Arc<DatabaseConnection>,
}

impl SalesService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Records a sale. Stock decrement, transaction row and activity entry
    /// commit together or not at all.
    #[instrument(skip(self, request), fields(
        warehouse_id = %request.warehouse_id,
        item_id = %request.inventory_item_id,
        quantity = request.quantity
    ))]
    pub async fn create_sale(
        &self,
        actor_id: Uuid,
        actor_role: UserRole,
        request: CreateSaleRequest,
    ) -> Result<SellTransactionModel, ServiceError> {
        if actor_role != UserRole::SuperAdmin {
            return Err(ServiceError::Forbidden(
                "Only super admin users can create sell transactions".to_string(),
            ));
        }
        request.validate()?;

        let result = self
            .db
            .transaction::<_, SellTransactionModel, ServiceError>(move |txn| {
                Box::pin(async move {
                    // The guarded decrement goes first so the transaction takes
                    // the write lock before it reads anything; on SQLite a read
                    // lock cannot be upgraded while another sale holds one.
                    let updated = InventoryItem::update_many()
                        .col_expr(
                            inventory_item::Column::Quantity,
                            Expr::col(inventory_item::Column::Quantity).sub(request.quantity),
                        )
                        .col_expr(inventory_item::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(inventory_item::Column::Id.eq(request.inventory_item_id))
                        .filter(inventory_item::Column::WarehouseId.eq(request.warehouse_id))
                        .filter(inventory_item::Column::Quantity.gte(request.quantity))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let warehouse = Warehouse::find_by_id(request.warehouse_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Warehouse with ID {} not found",
                                request.warehouse_id
                            ))
                        })?;

                    let item = InventoryItem::find_by_id(request.inventory_item_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Inventory item with ID {} not found",
                                request.inventory_item_id
                            ))
                        })?;

                    if item.warehouse_id != warehouse.id {
                        return Err(ServiceError::BadRequest(format!(
                            "Inventory item does not belong to warehouse {}",
                            warehouse.id
                        )));
                    }

                    if updated.rows_affected != 1 {
                        debug!(item_id = %item.id, available = item.quantity, "Sale refused by stock guard");
                        return Err(insufficient_stock(item.quantity, request.quantity));
                    }

                    // `item` already carries the decremented level
                    let change = plan_sale(item.quantity + request.quantity, request.quantity)?;

                    let unit_price = item.sell_price;
                    let total_price = sale_total(unit_price, request.quantity)?;

                    let sale = sell_transaction::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        warehouse_id: Set(warehouse.id),
                        inventory_item_id: Set(item.id),
                        user_id: Set(Some(actor_id)),
                        quantity: Set(request.quantity),
                        unit_price: Set(unit_price),
                        total_price: Set(total_price),
                        description: Set(request.description),
                        created_at: Set(Utc::now()),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    log_activity(
                        txn,
                        NewActivity::new(
                            Some(actor_id),
                            ActivityType::SellTransaction,
                            entity_types::SELL_TRANSACTION,
                            Some(sale.id),
                            format!(
                                "Sold {} units of {} from {}",
                                sale.quantity, item.name, warehouse.name
                            ),
                        )
                        .with_metadata(json!({
                            "transaction_id": sale.id,
                            "warehouse_id": warehouse.id,
                            "warehouse_name": warehouse.name,
                            "inventory_item_id": item.id,
                            "inventory_item_name": item.name,
                            "quantity": sale.quantity,
                            "unit_price": unit_price,
                            "total_price": total_price,
                            "previous_stock": change.previous,
                            "new_stock": change.new,
                            "quantity_change": change.delta(),
                        })),
                    )
                    .await?;

                    Ok(sale)
                })
            })
            .await;

        match result {
            Ok(sale) => {
                counter!("inventory_api.sales", 1);
                histogram!("inventory_api.sale_quantity", sale.quantity as f64);
                info!(transaction_id = %sale.id, total_price = %sale.total_price, "Sale recorded");
                Ok(sale)
            }
            Err(err) => {
                let err = ServiceError::from(err);
                counter!("inventory_api.sales_rejected", 1);
                Err(err)
            }
        }
    }

    /// All sales visible to the caller, newest first
    #[instrument(skip(self))]
    pub async fn list_sales(
        &self,
        scope: WarehouseScope,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<SellTransactionModel>, ServiceError> {
        let condition = match scope {
            WarehouseScope::All => Condition::all(),
            WarehouseScope::Single(id) => {
                Condition::all().add(sell_transaction::Column::WarehouseId.eq(id))
            }
            WarehouseScope::Nothing => return Ok(Vec::new()),
        };
        self.page(condition, skip, limit).await
    }

    #[instrument(skip(self))]
    pub async fn list_sales_for_warehouse(
        &self,
        scope: WarehouseScope,
        warehouse_id: Uuid,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<SellTransactionModel>, ServiceError> {
        if !scope.allows(warehouse_id) {
            return Err(ServiceError::Forbidden(
                "Not enough permissions to access this warehouse".to_string(),
            ));
        }
        let condition = Condition::all().add(sell_transaction::Column::WarehouseId.eq(warehouse_id));
        self.page(condition, skip, limit).await
    }

    #[instrument(skip(self))]
    pub async fn list_sales_for_item(
        &self,
        scope: WarehouseScope,
        item_id: Uuid,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<SellTransactionModel>, ServiceError> {
        let mut condition =
            Condition::all().add(sell_transaction::Column::InventoryItemId.eq(item_id));
        match scope {
            WarehouseScope::All => {}
            WarehouseScope::Single(id) => {
                condition = condition.add(sell_transaction::Column::WarehouseId.eq(id));
            }
            WarehouseScope::Nothing => return Ok(Vec::new()),
        }
        self.page(condition, skip, limit).await
    }

    async fn page(
        &self,
        condition: Condition,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<SellTransactionModel>, ServiceError> {
        SellTransaction::find()
            .filter(condition)
            .order_by_desc(sell_transaction::Column::CreatedAt)
            .offset(skip)
            .limit(limit.clamp(1, MAX_SALES_PAGE))
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }
}
