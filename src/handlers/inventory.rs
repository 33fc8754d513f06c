use crate::{
    auth::AuthUser,
    entities::InventoryItemModel,
    errors::{ApiError, ServiceError},
    handlers::common::{
        created_response, no_content_response, success_response, validate_input, AppJson,
    },
    services::inventory::{
        CreateInventoryRequest, InventoryItemResponse, InventoryQuery, InventoryStats,
        UpdateInventoryRequest, WarehouseInventoryQuery,
    },
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use uuid::Uuid;

fn to_responses(items: Vec<InventoryItemModel>) -> Result<Vec<InventoryItemResponse>, ServiceError> {
    items.into_iter().map(InventoryItemResponse::try_from).collect()
}

/// Stock summary across the caller's warehouses
#[utoipa::path(
    get,
    path = "/api/v1/inventories/stats",
    responses(
        (status = 200, description = "Inventory statistics", body = InventoryStats)
    ),
    security(("bearer_auth" = [])),
    tag = "inventories"
)]
pub async fn get_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.services.inventory.stats(user.scope()).await?;
    Ok(success_response(stats))
}

/// Stock summary for one warehouse
#[utoipa::path(
    get,
    path = "/api/v1/inventories/{id}/stats",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    responses(
        (status = 200, description = "Warehouse statistics", body = InventoryStats),
        (status = 403, description = "Warehouse outside caller scope", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventories"
)]
pub async fn get_warehouse_stats(
    State(state): State<AppState>,
    user: AuthUser,
    Path(warehouse_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state
        .services
        .inventory
        .warehouse_stats(user.scope(), warehouse_id)
        .await?;
    Ok(success_response(stats))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventories",
    params(InventoryQuery),
    responses(
        (status = 200, description = "Inventory items", body = [InventoryItemResponse]),
        (status = 403, description = "Warehouse outside caller scope", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventories"
)]
pub async fn list_items(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<InventoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = state.config.page_limit(query.limit);
    let items = state
        .services
        .inventory
        .list(user.scope(), &query, limit)
        .await?;
    Ok(success_response(to_responses(items)?))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventories",
    request_body = CreateInventoryRequest,
    responses(
        (status = 201, description = "Item created", body = InventoryItemResponse),
        (status = 400, description = "SKU already exists", body = crate::errors::ErrorResponse),
        (status = 403, description = "Warehouse outside caller scope", body = crate::errors::ErrorResponse),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Invalid input", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventories"
)]
pub async fn create_item(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateInventoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let item = state
        .services
        .inventory
        .create(user.user_id, user.scope(), payload)
        .await?;
    Ok(created_response(InventoryItemResponse::try_from(item)?))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventories/{id}",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    responses(
        (status = 200, description = "Item fetched", body = InventoryItemResponse),
        (status = 404, description = "Inventory item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventories"
)]
pub async fn get_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state.services.inventory.get(user.scope(), id).await?;
    Ok(success_response(InventoryItemResponse::try_from(item)?))
}

#[utoipa::path(
    put,
    path = "/api/v1/inventories/{id}",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    request_body = UpdateInventoryRequest,
    responses(
        (status = 200, description = "Item updated", body = InventoryItemResponse),
        (status = 400, description = "SKU already taken", body = crate::errors::ErrorResponse),
        (status = 404, description = "Inventory item not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Invalid input", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventories"
)]
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateInventoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let item = state
        .services
        .inventory
        .update(user.user_id, user.scope(), id, None, payload)
        .await?;
    Ok(success_response(InventoryItemResponse::try_from(item)?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventories/{id}",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 400, description = "Item still holds stock", body = crate::errors::ErrorResponse),
        (status = 404, description = "Inventory item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventories"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .inventory
        .delete(user.user_id, user.scope(), id, None)
        .await?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/inventories/category/{category}",
    params(("category" = String, Path, description = "Category name")),
    responses(
        (status = 200, description = "Items in category", body = [InventoryItemResponse])
    ),
    security(("bearer_auth" = [])),
    tag = "inventories"
)]
pub async fn list_by_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state
        .services
        .inventory
        .by_category(user.scope(), &category)
        .await?;
    Ok(success_response(to_responses(items)?))
}

/// Items whose name or description contains the term
#[utoipa::path(
    get,
    path = "/api/v1/inventories/search/{term}",
    params(("term" = String, Path, description = "Search term")),
    responses(
        (status = 200, description = "Matching items", body = [InventoryItemResponse])
    ),
    security(("bearer_auth" = [])),
    tag = "inventories"
)]
pub async fn search_items(
    State(state): State<AppState>,
    user: AuthUser,
    Path(term): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.services.inventory.search(user.scope(), &term).await?;
    Ok(success_response(to_responses(items)?))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventories/warehouse/{warehouse_id}",
    params(
        ("warehouse_id" = Uuid, Path, description = "Warehouse ID"),
        WarehouseInventoryQuery
    ),
    responses(
        (status = 200, description = "Items in warehouse", body = [InventoryItemResponse]),
        (status = 403, description = "Warehouse outside caller scope", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventories"
)]
pub async fn list_by_warehouse(
    State(state): State<AppState>,
    user: AuthUser,
    Path(warehouse_id): Path<Uuid>,
    Query(query): Query<WarehouseInventoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state
        .services
        .inventory
        .by_warehouse(user.scope(), warehouse_id, &query)
        .await?;
    Ok(success_response(to_responses(items)?))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventories/warehouse/{warehouse_id}/{id}",
    params(
        ("warehouse_id" = Uuid, Path, description = "Warehouse ID"),
        ("id" = Uuid, Path, description = "Inventory item ID")
    ),
    responses(
        (status = 200, description = "Item fetched", body = InventoryItemResponse),
        (status = 404, description = "Item not in this warehouse", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventories"
)]
pub async fn get_warehouse_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((warehouse_id, id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state
        .services
        .inventory
        .get_in_warehouse(user.scope(), warehouse_id, id)
        .await?;
    Ok(success_response(InventoryItemResponse::try_from(item)?))
}

#[utoipa::path(
    put,
    path = "/api/v1/inventories/warehouse/{warehouse_id}/{id}",
    params(
        ("warehouse_id" = Uuid, Path, description = "Warehouse ID"),
        ("id" = Uuid, Path, description = "Inventory item ID")
    ),
    request_body = UpdateInventoryRequest,
    responses(
        (status = 200, description = "Item updated", body = InventoryItemResponse),
        (status = 404, description = "Item not in this warehouse", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventories"
)]
pub async fn update_warehouse_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((warehouse_id, id)): Path<(Uuid, Uuid)>,
    AppJson(payload): AppJson<UpdateInventoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let item = state
        .services
        .inventory
        .update(user.user_id, user.scope(), id, Some(warehouse_id), payload)
        .await?;
    Ok(success_response(InventoryItemResponse::try_from(item)?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventories/warehouse/{warehouse_id}/{id}",
    params(
        ("warehouse_id" = Uuid, Path, description = "Warehouse ID"),
        ("id" = Uuid, Path, description = "Inventory item ID")
    ),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 404, description = "Item not in this warehouse", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventories"
)]
pub async fn delete_warehouse_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((warehouse_id, id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .inventory
        .delete(user.user_id, user.scope(), id, Some(warehouse_id))
        .await?;
    Ok(no_content_response())
}
