/*!
 * # Authentication and Authorization Module
 *
 * Bearer JWT (HS256) issuance and validation, the authentication middleware
 * that resolves a token to a live user row, the super-admin gate, and the
 * pure warehouse-scope policy used by the services.
 */

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::entities::{user, UserModel, UserRole};
use crate::errors::{ErrorResponse, ServiceError};

pub mod password;
pub mod policy;

pub use password::{hash_password, verify_password};
pub use policy::WarehouseScope;

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,    // Subject (user ID)
    pub role: UserRole, // Role at issue time; the live row wins on every request
    pub jti: String,    // JWT ID (unique identifier for this token)
    pub iat: i64,       // Issued at time
    pub exp: i64,       // Expiration time
}

/// Authenticated caller, resolved from the token and the current user row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub warehouse_id: Option<Uuid>,
    pub token_id: String,
}

impl AuthUser {
    pub fn from_model(user: &UserModel, token_id: impl Into<String>) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            warehouse_id: user.warehouse_id,
            token_id: token_id.into(),
        }
    }

    /// Check if the user has a specific role
    pub fn has_role(&self, role: UserRole) -> bool {
        self.role == role
    }

    /// Warehouses this caller may see
    pub fn scope(&self) -> WarehouseScope {
        WarehouseScope::for_user(self.role, self.warehouse_id)
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, access_token_expiration: Duration) -> Self {
        Self {
            jwt_secret,
            access_token_expiration,
        }
    }

    pub fn from_app_config(cfg: &crate::config::AppConfig) -> Self {
        let minutes = u64::try_from(cfg.jwt_expiration_minutes).unwrap_or(30);
        Self::new(cfg.jwt_secret.clone(), Duration::from_secs(minutes * 60))
    }
}

/// Authentication service that handles token issuance and validation
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    pub db: Arc<DatabaseConnection>,
    blacklisted_tokens: Arc<RwLock<Vec<BlacklistedToken>>>,
}

/// Token blacklist entry
#[derive(Clone, Debug)]
struct BlacklistedToken {
    jti: String,
    expiry: DateTime<Utc>,
}

/// A freshly signed access token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self {
            config,
            db,
            blacklisted_tokens: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Generate a JWT token for a user
    pub fn generate_token(&self, user: &UserModel) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let expires_at = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;
        let jti = Uuid::new_v4().to_string();

        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role,
            jti: jti.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(IssuedToken {
            token,
            jti,
            expires_at,
        })
    }

    /// Validate a JWT token and extract the claims
    pub async fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        if self.is_token_blacklisted(&claims.jti).await {
            return Err(AuthError::RevokedToken);
        }

        Ok(claims)
    }

    /// Resolves a bearer token to the live account behind it
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.validate_token(token).await?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        let user = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::UserNotFound)?;

        if !user.is_active {
            return Err(AuthError::InactiveUser);
        }

        Ok(AuthUser::from_model(&user, claims.jti))
    }

    /// Revoke a token (add it to the blacklist)
    pub async fn revoke_token(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.validate_token(token).await?;

        let expiry = DateTime::<Utc>::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);
        let mut blacklist = self.blacklisted_tokens.write().await;
        blacklist.push(BlacklistedToken {
            jti: claims.jti,
            expiry,
        });

        // Clean up expired tokens in the blacklist
        let now = Utc::now();
        blacklist.retain(|t| t.expiry > now);
        debug!(revoked = blacklist.len(), "Token revoked");

        Ok(())
    }

    /// Check if a token is blacklisted
    async fn is_token_blacklisted(&self, token_id: &str) -> bool {
        let blacklist = self.blacklisted_tokens.read().await;
        blacklist.iter().any(|t| t.jti == token_id)
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not authenticated")]
    MissingAuth,

    #[error("Could not validate credentials")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("User not found")]
    UserNotFound,

    #[error("User account is inactive")]
    InactiveUser,

    #[error("{0}")]
    InsufficientPermissions(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            Self::MissingAuth => (StatusCode::UNAUTHORIZED, "AUTH_MISSING"),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "AUTH_INVALID_TOKEN"),
            Self::TokenExpired => (StatusCode::UNAUTHORIZED, "AUTH_TOKEN_EXPIRED"),
            Self::RevokedToken => (StatusCode::UNAUTHORIZED, "AUTH_REVOKED_TOKEN"),
            Self::UserNotFound => (StatusCode::UNAUTHORIZED, "AUTH_USER_NOT_FOUND"),
            Self::InactiveUser => (StatusCode::FORBIDDEN, "AUTH_INACTIVE_USER"),
            Self::InsufficientPermissions(_) => {
                (StatusCode::FORBIDDEN, "AUTH_INSUFFICIENT_PERMISSIONS")
            }
            Self::TokenCreation(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "AUTH_TOKEN_CREATION_FAILED")
            }
            Self::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "AUTH_DATABASE_ERROR"),
            Self::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "AUTH_INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let message = if status.is_server_error() {
            warn!(error = %self, "Authentication failed with internal error");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            details: Some(serde_json::json!({ "code": code })),
            request_id: crate::tracing::current_request_id().map(|id| id.to_string()),
            timestamp: Utc::now().to_rfc3339(),
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err.parts().0 {
            StatusCode::UNAUTHORIZED => ServiceError::Unauthorized(err.to_string()),
            StatusCode::FORBIDDEN => ServiceError::Forbidden(err.to_string()),
            _ => ServiceError::InternalError(err.to_string()),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Role middleware to check if a user has the required role
pub async fn role_middleware(
    State(required_role): State<UserRole>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !user.has_role(required_role) {
        let message = match required_role {
            UserRole::SuperAdmin => "Super admin access required".to_string(),
            other => format!("{} access required", other),
        };
        return Err(AuthError::InsufficientPermissions(message));
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that extracts and validates auth tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return AuthError::InternalError("Authentication service not available".to_string())
                .into_response();
        }
    };

    let token = match bearer_token(request.headers()) {
        Some(token) => token.to_string(),
        None => return AuthError::MissingAuth.into_response(),
    };

    match auth_service.authenticate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Makes the shared [`AuthService`] visible to [`auth_middleware`]
pub async fn inject_auth_service(
    State(auth): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(auth);
    next.run(request).await
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_role(self, role: UserRole) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_role(self, role: UserRole) -> Self {
        self.layer(axum::middleware::from_fn_with_state(role, role_middleware))
            .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn sample_user(role: UserRole, is_active: bool) -> UserModel {
        UserModel {
            id: Uuid::new_v4(),
            name: "Dana".into(),
            email: "dana@example.com".into(),
            password_hash: String::new(),
            role,
            warehouse_id: None,
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service_with(rows: Vec<Vec<UserModel>>) -> AuthService {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results(rows)
            .into_connection();
        AuthService::new(
            AuthConfig::new(
                "unit-test-secret-with-enough-length-0123456789".into(),
                Duration::from_secs(60),
            ),
            Arc::new(db),
        )
    }

    #[tokio::test]
    async fn token_round_trip_carries_subject_and_role() {
        let service = service_with(vec![]);
        let user = sample_user(UserRole::SuperAdmin, true);
        let issued = service.generate_token(&user).unwrap();

        let claims = service.validate_token(&issued.token).await.unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role, UserRole::SuperAdmin);
        assert_eq!(claims.jti, issued.jti);
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn tampered_and_foreign_tokens_are_rejected() {
        let service = service_with(vec![]);
        let user = sample_user(UserRole::Warehouse, true);
        let issued = service.generate_token(&user).unwrap();

        let mut tampered = issued.token.clone();
        tampered.push('x');
        assert!(matches!(
            service.validate_token(&tampered).await,
            Err(AuthError::InvalidToken)
        ));

        let other = AuthService::new(
            AuthConfig::new(
                "a-completely-different-secret-9876543210".into(),
                Duration::from_secs(60),
            ),
            service.db.clone(),
        );
        assert!(matches!(
            other.validate_token(&issued.token).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn expired_tokens_report_expiry() {
        let service = service_with(vec![]);
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            role: UserRole::Warehouse,
            jti: Uuid::new_v4().to_string(),
            iat: Utc::now().timestamp() - 7200,
            exp: Utc::now().timestamp() - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(service.config.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            service.validate_token(&token).await,
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn revoked_tokens_are_rejected() {
        let service = service_with(vec![]);
        let issued = service
            .generate_token(&sample_user(UserRole::Warehouse, true))
            .unwrap();

        service.revoke_token(&issued.token).await.unwrap();
        assert!(matches!(
            service.validate_token(&issued.token).await,
            Err(AuthError::RevokedToken)
        ));
    }

    #[tokio::test]
    async fn authenticate_checks_the_live_user_row() {
        let active = sample_user(UserRole::Warehouse, true);
        let service = service_with(vec![vec![active.clone()]]);
        let issued = service.generate_token(&active).unwrap();
        let user = service.authenticate(&issued.token).await.unwrap();
        assert_eq!(user.user_id, active.id);
        assert_eq!(user.role, UserRole::Warehouse);

        let inactive = sample_user(UserRole::Warehouse, false);
        let service = service_with(vec![vec![inactive.clone()]]);
        let issued = service.generate_token(&inactive).unwrap();
        assert!(matches!(
            service.authenticate(&issued.token).await,
            Err(AuthError::InactiveUser)
        ));

        let ghost = sample_user(UserRole::Warehouse, true);
        let service = service_with(vec![vec![]]);
        let issued = service.generate_token(&ghost).unwrap();
        assert!(matches!(
            service.authenticate(&issued.token).await,
            Err(AuthError::UserNotFound)
        ));
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }

    #[tokio::test]
    async fn auth_errors_render_uniform_error_body() {
        let response = AuthError::InsufficientPermissions("Super admin access required".into())
            .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["message"], "Super admin access required");
        assert_eq!(payload["details"]["code"], "AUTH_INSUFFICIENT_PERMISSIONS");

        let response = AuthError::MissingAuth.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }
}
