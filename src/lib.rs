//! Inventory API Library
//!
//! Warehouses, stock levels, sell transactions and the activity trail behind
//! a JWT-authenticated REST surface.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod openapi;
pub mod seed;
pub mod services;
pub mod tracing;

use axum::{
    routing::{get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::auth::{AuthConfig, AuthRouterExt, AuthService};
use crate::entities::UserRole;
use crate::services::ServiceContainer;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub auth: Arc<AuthService>,
    pub services: ServiceContainer,
}

impl AppState {
    /// Wires the auth service and every domain service over one pool
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let auth = Arc::new(AuthService::new(
            AuthConfig::from_app_config(&config),
            db.clone(),
        ));
        let services = ServiceContainer::from_pool(db.clone());
        Self {
            db,
            config,
            auth,
            services,
        }
    }
}

pub fn api_v1_routes() -> Router<AppState> {
    // Anyone may register, sign in or drop a token
    let public = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout));

    let users_self = Router::new()
        .route("/users/me", get(handlers::users::get_me))
        .route(
            "/users/:id",
            get(handlers::users::get_user).put(handlers::users::update_user),
        )
        .with_auth();

    let users_admin = Router::new()
        .route("/users", get(handlers::users::list_users))
        .route("/users/:id", axum::routing::delete(handlers::users::delete_user))
        .with_role(UserRole::SuperAdmin);

    let warehouses_read = Router::new()
        .route("/warehouses", get(handlers::warehouses::list_warehouses))
        .route("/warehouses/:id", get(handlers::warehouses::get_warehouse))
        .with_auth();

    let warehouses_admin = Router::new()
        .route("/warehouses", post(handlers::warehouses::create_warehouse))
        .route(
            "/warehouses/:id",
            axum::routing::put(handlers::warehouses::update_warehouse)
                .delete(handlers::warehouses::delete_warehouse),
        )
        .with_role(UserRole::SuperAdmin);

    // Scoping to the caller's warehouse happens in the inventory service
    let inventories = Router::new()
        .route("/inventories/stats", get(handlers::inventory::get_stats))
        .route(
            "/inventories/:id/stats",
            get(handlers::inventory::get_warehouse_stats),
        )
        .route(
            "/inventories",
            get(handlers::inventory::list_items).post(handlers::inventory::create_item),
        )
        .route(
            "/inventories/:id",
            get(handlers::inventory::get_item)
                .put(handlers::inventory::update_item)
                .delete(handlers::inventory::delete_item),
        )
        .route(
            "/inventories/category/:category",
            get(handlers::inventory::list_by_category),
        )
        .route(
            "/inventories/search/:term",
            get(handlers::inventory::search_items),
        )
        .route(
            "/inventories/warehouse/:warehouse_id",
            get(handlers::inventory::list_by_warehouse),
        )
        .route(
            "/inventories/warehouse/:warehouse_id/:id",
            get(handlers::inventory::get_warehouse_item)
                .put(handlers::inventory::update_warehouse_item)
                .delete(handlers::inventory::delete_warehouse_item),
        )
        .with_auth();

    // POST /sell is role checked inside the sales service so that a
    // forbidden caller is rejected before the body is validated
    let sell = Router::new()
        .route(
            "/sell",
            get(handlers::sell::list_sales).post(handlers::sell::create_sale),
        )
        .route(
            "/sell/warehouse/:warehouse_id",
            get(handlers::sell::list_sales_for_warehouse),
        )
        .route(
            "/sell/inventory/:inventory_item_id",
            get(handlers::sell::list_sales_for_item),
        )
        .with_auth();

    let activity = Router::new()
        .route("/activity", get(handlers::activity::list_activities))
        .route(
            "/activity/entity/:entity_type/:entity_id",
            get(handlers::activity::list_entity_activities),
        )
        .with_auth();

    Router::new()
        .merge(public)
        .merge(users_self)
        .merge(users_admin)
        .merge(warehouses_read)
        .merge(warehouses_admin)
        .merge(inventories)
        .merge(sell)
        .merge(activity)
}

/// Full application router: banner, health, the v1 API and Swagger UI,
/// wrapped in the tracing, auth-injection and request id layers.
///
/// CORS and compression are left to the binary so tests see raw bodies.
pub fn build_router(state: AppState) -> Router {
    let auth_service = state.auth.clone();

    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api_v1_routes())
        .with_state(state)
        .merge(openapi::swagger_ui())
        .layer(axum::middleware::from_fn(
            crate::tracing::request_metrics_middleware,
        ))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Inject AuthService into request extensions for auth middleware
        .layer(axum::middleware::from_fn_with_state(
            auth_service,
            auth::inject_auth_service,
        ))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
}

pub mod prelude {
    pub use crate::auth::{AuthService, AuthUser};
    pub use crate::db::*;
    pub use crate::errors::*;
    pub use crate::openapi::*;
    pub use crate::services::*;
    pub use crate::tracing::*;
    pub use crate::{build_router, AppState};
}
