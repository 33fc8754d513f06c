use crate::{
    auth::policy::{OutOfScope, WarehouseScope},
    entities::{inventory_item, ActivityType, InventoryItem, InventoryItemModel, Warehouse},
    errors::ServiceError,
    services::activity::{entity_types, log_activity, NewActivity},
};
use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    sea_query::{Alias, Expr, Func, SimpleExpr},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

const SELL_PRICE_MESSAGE: &str = "Sell price must be higher than buy price";

/// Largest price a `DECIMAL(12, 2)` column holds
pub const MAX_PRICE: Decimal = dec!(9999999999.99);

fn price_in_range(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("negative_price");
        err.message = Some("Price cannot be negative".into());
        return Err(err);
    }
    if *value > MAX_PRICE {
        let mut err = ValidationError::new("price_too_large");
        err.message = Some(format!("Price cannot exceed {}", MAX_PRICE).into());
        return Err(err);
    }
    Ok(())
}

fn sell_above_buy(buy_price: Decimal, sell_price: Decimal) -> Result<(), ValidationError> {
    if sell_price <= buy_price {
        let mut err = ValidationError::new("sell_price_not_above_buy_price");
        err.message = Some(SELL_PRICE_MESSAGE.into());
        return Err(err);
    }
    Ok(())
}

fn validate_create_prices(request: &CreateInventoryRequest) -> Result<(), ValidationError> {
    sell_above_buy(request.buy_price, request.sell_price)
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_create_prices", skip_on_field_errors = false))]
pub struct CreateInventoryRequest {
    pub warehouse_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub sku: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Stocks cannot be negative"))]
    pub quantity: i32,
    #[serde(default)]
    #[validate(custom = "price_in_range")]
    #[schema(value_type = String, example = "10.00")]
    pub buy_price: Decimal,
    #[serde(default)]
    #[validate(custom = "price_in_range")]
    #[schema(value_type = String, example = "15.00")]
    pub sell_price: Decimal,
    #[validate(length(max = 50))]
    pub category: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub min_stock_level: i32,
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateInventoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub sku: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Stocks cannot be negative"))]
    pub quantity: Option<i32>,
    #[validate(custom = "price_in_range")]
    #[schema(value_type = Option<String>)]
    pub buy_price: Option<Decimal>,
    #[validate(custom = "price_in_range")]
    #[schema(value_type = Option<String>)]
    pub sell_price: Option<Decimal>,
    #[validate(length(max = 50))]
    pub category: Option<String>,
    #[validate(range(min = 0))]
    pub min_stock_level: Option<i32>,
}

/// Item as returned over the API, with its derived fields
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InventoryItemResponse {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub quantity: i32,
    #[schema(value_type = String, example = "10.00")]
    pub buy_price: Decimal,
    #[schema(value_type = String, example = "15.00")]
    pub sell_price: Decimal,
    pub category: Option<String>,
    pub min_stock_level: i32,
    pub is_low_stock: bool,
    #[schema(value_type = String, example = "250.00")]
    pub total_value: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<InventoryItemModel> for InventoryItemResponse {
    type Error = ServiceError;

    fn try_from(item: InventoryItemModel) -> Result<Self, Self::Error> {
        let is_low_stock = item.is_low_stock();
        let total_value = item.total_value().ok_or_else(stock_value_out_of_range)?;
        Ok(Self {
            id: item.id,
            warehouse_id: item.warehouse_id,
            name: item.name,
            sku: item.sku,
            description: item.description,
            quantity: item.quantity,
            buy_price: item.buy_price,
            sell_price: item.sell_price,
            category: item.category,
            min_stock_level: item.min_stock_level,
            is_low_stock,
            total_value,
            created_at: item.created_at,
            updated_at: item.updated_at,
        })
    }
}

fn stock_value_out_of_range() -> ServiceError {
    ServiceError::ValidationError("Stock value exceeds the supported range".to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InventoryStats {
    pub total_items: u64,
    pub low_stock_items: u64,
    pub total_categories: u64,
    pub total_warehouses: u64,
    #[schema(value_type = String, example = "1250.00")]
    pub total_value: Decimal,
}

/// Aggregate row: items, low stock, categories, warehouses, value as text
type StatsRow = (i64, Option<i64>, i64, i64, Option<String>);

impl InventoryStats {
    /// Builds the summary from one aggregate row. `single_warehouse` pins the
    /// warehouse count to 1 for per-warehouse stats.
    fn from_row(row: StatsRow, single_warehouse: bool) -> Result<Self, ServiceError> {
        let (items, low_stock, categories, warehouses, value) = row;
        Ok(Self {
            total_items: items.max(0) as u64,
            low_stock_items: low_stock.unwrap_or(0).max(0) as u64,
            total_categories: categories.max(0) as u64,
            total_warehouses: if single_warehouse { 1 } else { warehouses.max(0) as u64 },
            total_value: parse_aggregate_decimal(value.as_deref())?,
        })
    }
}

/// Sums come back as text so both backends decode them the same way. SQLite
/// may render large REAL sums in exponent form.
fn parse_aggregate_decimal(raw: Option<&str>) -> Result<Decimal, ServiceError> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(Decimal::ZERO);
    };
    raw.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(raw))
        .map(|value| value.round_dp(2))
        .map_err(|_| stock_value_out_of_range())
}

/// Listing filters for `GET /inventories`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InventoryQuery {
    pub warehouse_id: Option<Uuid>,
    pub category: Option<String>,
    /// Only items with at least this much stock
    pub min_stock: Option<i32>,
    pub skip: Option<u64>,
    /// Page size, capped at 1000
    pub limit: Option<u64>,
}

/// Filters accepted on the per-warehouse listing
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WarehouseInventoryQuery {
    pub category: Option<String>,
    pub min_stock: Option<i32>,
}

fn warehouse_forbidden() -> ServiceError {
    ServiceError::Forbidden("Not enough permissions to access this warehouse".to_string())
}

fn item_not_found() -> ServiceError {
    ServiceError::NotFound("Inventory item not found".to_string())
}

/// Inventory items, confined to the caller's [`WarehouseScope`]
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(sku = %request.sku))]
    pub async fn create(
        &self,
        actor_id: Uuid,
        scope: WarehouseScope,
        request: CreateInventoryRequest,
    ) -> Result<InventoryItemModel, ServiceError> {
        request.validate()?;
        if !scope.allows(request.warehouse_id) {
            return Err(warehouse_forbidden());
        }

        let created = self
            .db
            .transaction::<_, InventoryItemModel, ServiceError>(move |txn| {
                Box::pin(async move {
                    Warehouse::find_by_id(request.warehouse_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Warehouse with ID {} not found",
                                request.warehouse_id
                            ))
                        })?;

                    if find_by_sku(txn, &request.sku).await?.is_some() {
                        return Err(ServiceError::BadRequest("SKU already exists".to_string()));
                    }

                    let now = Utc::now();
                    let saved = inventory_item::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        warehouse_id: Set(request.warehouse_id),
                        name: Set(request.name),
                        sku: Set(request.sku),
                        description: Set(request.description),
                        quantity: Set(request.quantity),
                        buy_price: Set(request.buy_price),
                        sell_price: Set(request.sell_price),
                        category: Set(request.category),
                        min_stock_level: Set(request.min_stock_level),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    log_activity(
                        txn,
                        NewActivity::new(
                            Some(actor_id),
                            ActivityType::InventoryCreated,
                            entity_types::INVENTORY,
                            Some(saved.id),
                            format!("Created inventory item {} ({})", saved.name, saved.sku),
                        )
                        .with_metadata(json!({
                            "warehouse_id": saved.warehouse_id,
                            "sku": saved.sku,
                            "quantity": saved.quantity,
                        })),
                    )
                    .await?;

                    Ok(saved)
                })
            })
            .await?;

        counter!("inventory_api.items_created", 1);
        info!(item_id = %created.id, warehouse_id = %created.warehouse_id, "Inventory item created");
        Ok(created)
    }

    /// Lists items in scope. A scoped caller asking for another warehouse is
    /// refused; a caller with no warehouse gets an empty page.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        scope: WarehouseScope,
        query: &InventoryQuery,
        limit: u64,
    ) -> Result<Vec<InventoryItemModel>, ServiceError> {
        let warehouse_id = match resolve_warehouse_filter(scope, query.warehouse_id)? {
            Some(filter) => filter,
            None => return Ok(Vec::new()),
        };

        let condition = filter_condition(warehouse_id, query.category.as_deref(), query.min_stock);

        InventoryItem::find()
            .filter(condition)
            .order_by_asc(inventory_item::Column::Name)
            .offset(query.skip.unwrap_or(0))
            .limit(limit)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Items out of scope are reported as missing.
    #[instrument(skip(self))]
    pub async fn get(
        &self,
        scope: WarehouseScope,
        id: Uuid,
    ) -> Result<InventoryItemModel, ServiceError> {
        load_scoped(&*self.db, scope, id, None).await
    }

    /// Fetches an item that must live in `warehouse_id`.
    #[instrument(skip(self))]
    pub async fn get_in_warehouse(
        &self,
        scope: WarehouseScope,
        warehouse_id: Uuid,
        id: Uuid,
    ) -> Result<InventoryItemModel, ServiceError> {
        if !scope.allows(warehouse_id) {
            return Err(warehouse_forbidden());
        }
        load_scoped(&*self.db, scope, id, Some(warehouse_id)).await
    }

    /// Partial update. Prices are checked after merging with the stored row.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        actor_id: Uuid,
        scope: WarehouseScope,
        id: Uuid,
        expected_warehouse: Option<Uuid>,
        request: UpdateInventoryRequest,
    ) -> Result<InventoryItemModel, ServiceError> {
        if let Some(warehouse_id) = expected_warehouse {
            if !scope.allows(warehouse_id) {
                return Err(warehouse_forbidden());
            }
        }
        request.validate()?;

        let updated = self
            .db
            .transaction::<_, InventoryItemModel, ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = load_scoped(txn, scope, id, expected_warehouse).await?;

                    let buy_price = request.buy_price.unwrap_or(existing.buy_price);
                    let sell_price = request.sell_price.unwrap_or(existing.sell_price);
                    if sell_price <= buy_price {
                        return Err(ServiceError::ValidationError(SELL_PRICE_MESSAGE.to_string()));
                    }

                    let mut changed = Vec::new();
                    let mut active: inventory_item::ActiveModel = existing.clone().into();

                    if let Some(sku) = request.sku {
                        if sku != existing.sku {
                            if find_by_sku(txn, &sku).await?.is_some() {
                                return Err(ServiceError::BadRequest(
                                    "SKU already taken".to_string(),
                                ));
                            }
                            active.sku = Set(sku);
                            changed.push("sku");
                        }
                    }
                    if let Some(name) = request.name {
                        active.name = Set(name);
                        changed.push("name");
                    }
                    if let Some(description) = request.description {
                        active.description = Set(Some(description));
                        changed.push("description");
                    }
                    if let Some(price) = request.buy_price {
                        active.buy_price = Set(price);
                        changed.push("buy_price");
                    }
                    if let Some(price) = request.sell_price {
                        active.sell_price = Set(price);
                        changed.push("sell_price");
                    }
                    if let Some(category) = request.category {
                        active.category = Set(Some(category));
                        changed.push("category");
                    }
                    if let Some(level) = request.min_stock_level {
                        active.min_stock_level = Set(level);
                        changed.push("min_stock_level");
                    }
                    let quantity_change = match request.quantity {
                        Some(quantity) if quantity != existing.quantity => {
                            active.quantity = Set(quantity);
                            Some((existing.quantity, quantity))
                        }
                        _ => None,
                    };
                    active.updated_at = Set(Utc::now());

                    let saved = active.update(txn).await.map_err(ServiceError::db_error)?;

                    if let Some((previous, new)) = quantity_change {
                        log_activity(
                            txn,
                            NewActivity::new(
                                Some(actor_id),
                                ActivityType::InventoryStockAdjusted,
                                entity_types::INVENTORY,
                                Some(saved.id),
                                format!(
                                    "Adjusted stock of {} from {} to {}",
                                    saved.name, previous, new
                                ),
                            )
                            .with_metadata(json!({
                                "warehouse_id": saved.warehouse_id,
                                "previous_stock": previous,
                                "new_stock": new,
                                "quantity_change": new - previous,
                            })),
                        )
                        .await?;
                    }

                    if !changed.is_empty() {
                        log_activity(
                            txn,
                            NewActivity::new(
                                Some(actor_id),
                                ActivityType::InventoryUpdated,
                                entity_types::INVENTORY,
                                Some(saved.id),
                                format!("Updated inventory item {}", saved.name),
                            )
                            .with_metadata(json!({
                                "warehouse_id": saved.warehouse_id,
                                "updated_fields": changed,
                            })),
                        )
                        .await?;
                    }

                    Ok(saved)
                })
            })
            .await?;

        info!(item_id = %updated.id, "Inventory item updated");
        Ok(updated)
    }

    /// Deletes an empty item. Stock must be drawn down to zero first.
    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        actor_id: Uuid,
        scope: WarehouseScope,
        id: Uuid,
        expected_warehouse: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        if let Some(warehouse_id) = expected_warehouse {
            if !scope.allows(warehouse_id) {
                return Err(warehouse_forbidden());
            }
        }

        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = load_scoped(txn, scope, id, expected_warehouse).await?;

                    if existing.quantity != 0 {
                        return Err(ServiceError::BadRequest(
                            "Cannot delete inventory item with non-zero stock quantity"
                                .to_string(),
                        ));
                    }

                    InventoryItem::delete_by_id(id)
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    log_activity(
                        txn,
                        NewActivity::new(
                            Some(actor_id),
                            ActivityType::InventoryDeleted,
                            entity_types::INVENTORY,
                            Some(id),
                            format!("Deleted inventory item {} ({})", existing.name, existing.sku),
                        )
                        .with_metadata(json!({
                            "warehouse_id": existing.warehouse_id,
                            "sku": existing.sku,
                        })),
                    )
                    .await?;

                    Ok(())
                })
            })
            .await?;

        counter!("inventory_api.items_deleted", 1);
        info!(item_id = %id, "Inventory item deleted");
        Ok(())
    }

    /// Summary over everything the caller can see
    #[instrument(skip(self))]
    pub async fn stats(&self, scope: WarehouseScope) -> Result<InventoryStats, ServiceError> {
        let (condition, single) = match scope {
            WarehouseScope::All => (Condition::all(), false),
            WarehouseScope::Single(id) => {
                (Condition::all().add(inventory_item::Column::WarehouseId.eq(id)), true)
            }
            WarehouseScope::Nothing => return Ok(InventoryStats::default()),
        };

        let row = self.aggregate(condition).await?;
        InventoryStats::from_row(row, single)
    }

    #[instrument(skip(self))]
    pub async fn warehouse_stats(
        &self,
        scope: WarehouseScope,
        warehouse_id: Uuid,
    ) -> Result<InventoryStats, ServiceError> {
        if !scope.allows(warehouse_id) {
            return Err(warehouse_forbidden());
        }

        let row = self
            .aggregate(Condition::all().add(inventory_item::Column::WarehouseId.eq(warehouse_id)))
            .await?;
        InventoryStats::from_row(row, true)
    }

    /// Counts and stock value computed by the database in one pass
    async fn aggregate(&self, condition: Condition) -> Result<StatsRow, ServiceError> {
        use inventory_item::Column;

        let stock_value = Func::sum(Expr::col(Column::Quantity).mul(Expr::col(Column::BuyPrice)));

        let row = InventoryItem::find()
            .select_only()
            .column_as(Expr::col(Column::Id).count(), "total_items")
            .column_as(
                Expr::cust("SUM(CASE WHEN quantity <= min_stock_level THEN 1 ELSE 0 END)"),
                "low_stock_items",
            )
            .column_as(Expr::cust("COUNT(DISTINCT category)"), "total_categories")
            .column_as(Expr::cust("COUNT(DISTINCT warehouse_id)"), "total_warehouses")
            .column_as(
                SimpleExpr::from(Func::cast_as(stock_value, Alias::new("text"))),
                "total_value",
            )
            .filter(condition)
            .into_tuple::<StatsRow>()
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(row.unwrap_or((0, None, 0, 0, None)))
    }

    #[instrument(skip(self))]
    pub async fn by_category(
        &self,
        scope: WarehouseScope,
        category: &str,
    ) -> Result<Vec<InventoryItemModel>, ServiceError> {
        let warehouse_id = match resolve_warehouse_filter(scope, None)? {
            Some(filter) => filter,
            None => return Ok(Vec::new()),
        };

        InventoryItem::find()
            .filter(filter_condition(warehouse_id, Some(category), None))
            .order_by_asc(inventory_item::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Case follows the backend's LIKE semantics.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        scope: WarehouseScope,
        term: &str,
    ) -> Result<Vec<InventoryItemModel>, ServiceError> {
        let warehouse_id = match resolve_warehouse_filter(scope, None)? {
            Some(filter) => filter,
            None => return Ok(Vec::new()),
        };

        let matches = Condition::any()
            .add(inventory_item::Column::Name.contains(term))
            .add(inventory_item::Column::Description.contains(term));

        InventoryItem::find()
            .filter(filter_condition(warehouse_id, None, None).add(matches))
            .order_by_asc(inventory_item::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn by_warehouse(
        &self,
        scope: WarehouseScope,
        warehouse_id: Uuid,
        query: &WarehouseInventoryQuery,
    ) -> Result<Vec<InventoryItemModel>, ServiceError> {
        if !scope.allows(warehouse_id) {
            return Err(warehouse_forbidden());
        }

        InventoryItem::find()
            .filter(filter_condition(
                Some(warehouse_id),
                query.category.as_deref(),
                query.min_stock,
            ))
            .order_by_asc(inventory_item::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }
}

/// `Ok(None)` means the caller can see nothing at all; `Ok(Some(filter))`
/// carries the warehouse restriction to apply, if any.
fn resolve_warehouse_filter(
    scope: WarehouseScope,
    requested: Option<Uuid>,
) -> Result<Option<Option<Uuid>>, ServiceError> {
    match scope.narrow(requested) {
        Ok(filter) => Ok(Some(filter)),
        Err(OutOfScope) if requested.is_none() => Ok(None),
        Err(OutOfScope) => Err(warehouse_forbidden()),
    }
}

fn filter_condition(
    warehouse_id: Option<Uuid>,
    category: Option<&str>,
    min_stock: Option<i32>,
) -> Condition {
    let mut condition = Condition::all();
    if let Some(id) = warehouse_id {
        condition = condition.add(inventory_item::Column::WarehouseId.eq(id));
    }
    if let Some(category) = category {
        condition = condition.add(inventory_item::Column::Category.eq(category));
    }
    if let Some(min_stock) = min_stock {
        condition = condition.add(inventory_item::Column::Quantity.gte(min_stock));
    }
    condition
}

async fn load_scoped<C: ConnectionTrait>(
    conn: &C,
    scope: WarehouseScope,
    id: Uuid,
    expected_warehouse: Option<Uuid>,
) -> Result<InventoryItemModel, ServiceError> {
    let item = InventoryItem::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(item_not_found)?;

    if !scope.allows(item.warehouse_id) {
        return Err(item_not_found());
    }
    if expected_warehouse.is_some_and(|expected| expected != item.warehouse_id) {
        return Err(item_not_found());
    }
    Ok(item)
}

async fn find_by_sku<C: ConnectionTrait>(
    conn: &C,
    sku: &str,
) -> Result<Option<InventoryItemModel>, ServiceError> {
    InventoryItem::find()
        .filter(inventory_item::Column::Sku.eq(sku))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}
