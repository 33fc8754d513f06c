use crate::{
    auth::AuthUser,
    entities::ActivityModel,
    errors::ApiError,
    handlers::common::{success_response, PaginationParams},
    services::activity::ActivityQuery,
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Activity page plus the number of rows matching the filters
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActivityListResponse {
    pub success: bool,
    pub data: Vec<ActivityModel>,
    pub total: u64,
    pub error: Option<String>,
}

impl ActivityListResponse {
    fn new(data: Vec<ActivityModel>, total: u64) -> Self {
        Self {
            success: true,
            data,
            total,
            error: None,
        }
    }
}

/// Audit trail, newest first
///
/// Filters combine with AND. Visible to every authenticated user.
#[utoipa::path(
    get,
    path = "/api/v1/activity",
    params(ActivityQuery),
    responses(
        (status = 200, description = "Activity feed", body = ActivityListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "activity"
)]
pub async fn list_activities(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<ActivityQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (rows, total) = state.services.activity.list(&query).await?;
    Ok(success_response(ActivityListResponse::new(rows, total)))
}

#[utoipa::path(
    get,
    path = "/api/v1/activity/entity/{entity_type}/{entity_id}",
    params(
        ("entity_type" = String, Path, description = "inventory, warehouse, sell_transaction or user"),
        ("entity_id" = Uuid, Path, description = "Entity ID"),
        PaginationParams
    ),
    responses(
        (status = 200, description = "History of one entity", body = ActivityListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "activity"
)]
pub async fn list_entity_activities(
    State(state): State<AppState>,
    _user: AuthUser,
    Path((entity_type, entity_id)): Path<(String, Uuid)>,
    Query(page): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (rows, total) = state
        .services
        .activity
        .list_for_entity(&entity_type, entity_id, page.skip, page.limit)
        .await?;
    Ok(success_response(ActivityListResponse::new(rows, total)))
}
