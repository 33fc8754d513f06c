use crate::{
    auth::{policy, AuthUser},
    errors::{ApiError, ServiceError},
    handlers::common::{
        no_content_response, success_response, validate_input, AppJson, PaginationParams,
    },
    services::users::{UpdateUserRequest, UserResponse, MAX_USER_PAGE},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use uuid::Uuid;

/// The caller's own account
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let me = state.services.users.get(user.user_id).await?;
    Ok(success_response(UserResponse::from(me)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(PaginationParams),
    responses(
        (status = 200, description = "Users listed", body = [UserResponse]),
        (status = 403, description = "Super admin access required", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state
        .services
        .users
        .list(page.offset(), page.limit_or(MAX_USER_PAGE, MAX_USER_PAGE))
        .await?;
    Ok(success_response(
        users.into_iter().map(UserResponse::from).collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User fetched", body = UserResponse),
        (status = 403, description = "Not enough permissions", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if !policy::can_access_user(user.role, user.user_id, id) {
        return Err(ServiceError::Forbidden("Not enough permissions".to_string()).into());
    }
    let found = state.services.users.get(id).await?;
    Ok(success_response(UserResponse::from(found)))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Email already taken", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not enough permissions", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let updated = state
        .services
        .users
        .update(user.user_id, user.role, id, payload)
        .await?;
    Ok(success_response(UserResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Cannot delete your own account", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.users.delete(user.user_id, id).await?;
    Ok(no_content_response())
}
