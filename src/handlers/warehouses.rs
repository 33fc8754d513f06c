use crate::{
    auth::AuthUser,
    entities::WarehouseModel,
    errors::ApiError,
    handlers::common::{
        created_response, no_content_response, success_response, validate_input, AppJson,
        PaginationParams,
    },
    services::warehouses::{CreateWarehouseRequest, UpdateWarehouseRequest},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/v1/warehouses",
    request_body = CreateWarehouseRequest,
    responses(
        (status = 201, description = "Warehouse created", body = WarehouseModel),
        (status = 400, description = "Warehouse name already exists", body = crate::errors::ErrorResponse),
        (status = 403, description = "Super admin access required", body = crate::errors::ErrorResponse),
        (status = 422, description = "Invalid input", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "warehouses"
)]
pub async fn create_warehouse(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateWarehouseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let warehouse = state.services.warehouses.create(user.user_id, payload).await?;
    Ok(created_response(warehouse))
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouses",
    params(PaginationParams),
    responses(
        (status = 200, description = "Warehouses listed", body = [WarehouseModel]),
        (status = 401, description = "Not authenticated", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "warehouses"
)]
pub async fn list_warehouses(
    State(state): State<AppState>,
    Query(page): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = state.config.page_limit(page.limit);
    let warehouses = state
        .services
        .warehouses
        .list(page.offset(), limit)
        .await?;
    Ok(success_response(warehouses))
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouses/{id}",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    responses(
        (status = 200, description = "Warehouse fetched", body = WarehouseModel),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "warehouses"
)]
pub async fn get_warehouse(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let warehouse = state.services.warehouses.get(id).await?;
    Ok(success_response(warehouse))
}

#[utoipa::path(
    put,
    path = "/api/v1/warehouses/{id}",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    request_body = UpdateWarehouseRequest,
    responses(
        (status = 200, description = "Warehouse updated", body = WarehouseModel),
        (status = 400, description = "Warehouse name already taken", body = crate::errors::ErrorResponse),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "warehouses"
)]
pub async fn update_warehouse(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateWarehouseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let warehouse = state
        .services
        .warehouses
        .update(user.user_id, id, payload)
        .await?;
    Ok(success_response(warehouse))
}

/// Delete a warehouse together with its inventory
#[utoipa::path(
    delete,
    path = "/api/v1/warehouses/{id}",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    responses(
        (status = 204, description = "Warehouse deleted"),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "warehouses"
)]
pub async fn delete_warehouse(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.warehouses.delete(user.user_id, id).await?;
    Ok(no_content_response())
}
