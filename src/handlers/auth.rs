use crate::{
    auth::bearer_token,
    entities::{UserModel, UserRole},
    errors::{ApiError, ServiceError},
    handlers::common::{created_response, no_content_response, success_response, validate_input, AppJson},
    services::users::{LoginRequest, RegisterRequest},
    AppState,
};
use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

/// Signed-in user together with their bearer token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthUserData {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub warehouse_id: Option<Uuid>,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub data: Option<AuthUserData>,
    pub error: Option<String>,
}

fn issue(state: &AppState, user: &UserModel) -> Result<AuthResponse, ApiError> {
    let issued = state.auth.generate_token(user).map_err(ServiceError::from)?;
    Ok(AuthResponse {
        success: true,
        data: Some(AuthUserData {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            warehouse_id: user.warehouse_id,
            token: issued.token,
        }),
        error: None,
    })
}

/// Register a new warehouse user and sign them in
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Email already registered", body = crate::errors::ErrorResponse),
        (status = 422, description = "Invalid input", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let user = state.services.users.register(payload).await?;
    Ok(created_response(issue(&state, &user)?))
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Incorrect email or password", body = crate::errors::ErrorResponse),
        (status = 403, description = "User account is inactive", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let user = state.services.users.login(payload).await?;
    Ok(success_response(issue(&state, &user)?))
}

/// Revoke the presented token, if any
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 204, description = "Signed out")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = bearer_token(&headers) {
        match state.auth.revoke_token(token).await {
            Ok(()) => info!("Token revoked on logout"),
            // An unusable token needs no revocation.
            Err(e) => debug!(error = %e, "Logout with unusable token"),
        }
    }
    no_content_response()
}
