use crate::{
    auth::AuthUser,
    entities::SellTransactionModel,
    errors::ApiError,
    handlers::common::{created_response, success_response, AppJson, PaginationParams},
    services::sales::{CreateSaleRequest, DEFAULT_SALES_PAGE, MAX_SALES_PAGE},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use uuid::Uuid;

/// Sell stock out of a warehouse
///
/// Super admins only; the role is checked before the body is validated.
/// Stock, transaction row and activity entry are written atomically.
#[utoipa::path(
    post,
    path = "/api/v1/sell",
    request_body = CreateSaleRequest,
    responses(
        (status = 201, description = "Sale recorded", body = SellTransactionModel),
        (status = 400, description = "Insufficient stock or item not in warehouse", body = crate::errors::ErrorResponse),
        (status = 403, description = "Only super admin users can create sell transactions", body = crate::errors::ErrorResponse),
        (status = 404, description = "Warehouse or item not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Invalid input", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sell"
)]
pub async fn create_sale(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateSaleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let sale = state
        .services
        .sales
        .create_sale(user.user_id, user.role, payload)
        .await?;
    Ok(created_response(sale))
}

#[utoipa::path(
    get,
    path = "/api/v1/sell",
    params(PaginationParams),
    responses(
        (status = 200, description = "Sales, newest first", body = [SellTransactionModel])
    ),
    security(("bearer_auth" = [])),
    tag = "sell"
)]
pub async fn list_sales(
    State(state): State<AppState>,
    user: AuthUser,
    Query(page): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let sales = state
        .services
        .sales
        .list_sales(
            user.scope(),
            page.offset(),
            page.limit_or(DEFAULT_SALES_PAGE, MAX_SALES_PAGE),
        )
        .await?;
    Ok(success_response(sales))
}

#[utoipa::path(
    get,
    path = "/api/v1/sell/warehouse/{warehouse_id}",
    params(
        ("warehouse_id" = Uuid, Path, description = "Warehouse ID"),
        PaginationParams
    ),
    responses(
        (status = 200, description = "Sales from this warehouse", body = [SellTransactionModel]),
        (status = 403, description = "Warehouse outside caller scope", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sell"
)]
pub async fn list_sales_for_warehouse(
    State(state): State<AppState>,
    user: AuthUser,
    Path(warehouse_id): Path<Uuid>,
    Query(page): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let sales = state
        .services
        .sales
        .list_sales_for_warehouse(
            user.scope(),
            warehouse_id,
            page.offset(),
            page.limit_or(DEFAULT_SALES_PAGE, MAX_SALES_PAGE),
        )
        .await?;
    Ok(success_response(sales))
}

#[utoipa::path(
    get,
    path = "/api/v1/sell/inventory/{inventory_item_id}",
    params(
        ("inventory_item_id" = Uuid, Path, description = "Inventory item ID"),
        PaginationParams
    ),
    responses(
        (status = 200, description = "Sales of this item", body = [SellTransactionModel])
    ),
    security(("bearer_auth" = [])),
    tag = "sell"
)]
pub async fn list_sales_for_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
    Query(page): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let sales = state
        .services
        .sales
        .list_sales_for_item(
            user.scope(),
            item_id,
            page.offset(),
            page.limit_or(DEFAULT_SALES_PAGE, MAX_SALES_PAGE),
        )
        .await?;
    Ok(success_response(sales))
}
