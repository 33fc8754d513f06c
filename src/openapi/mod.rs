use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

/// Registers the bearer JWT scheme referenced by `security(("bearer_auth" = []))`
struct BearerAuthAddon;

impl Modify for BearerAuthAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inventory Management API",
        version = "1.0.0",
        description = r#"
# Inventory Management API

Multi-warehouse stock tracking with an audit trail.

## Features

- **Warehouses**: Create and manage stocking locations
- **Inventory**: Items per warehouse with low-stock and value figures
- **Sell transactions**: Atomic stock draw-down, never below zero
- **Activity log**: Every mutation is recorded with its actor

## Authentication

Sign in through `/api/v1/auth/login` and send the returned token:

```
Authorization: Bearer <your-jwt-token>
```

Users hold either the `super_admin` role, spanning every warehouse, or the
`warehouse` role, confined to their assigned warehouse.

## Error Handling

Every failure returns the same body:

```json
{
  "error": "Bad Request",
  "message": "Insufficient stock. Available: 3, Requested: 5",
  "request_id": "2b4f0c1e-7d0a-4c55-9d0c-5b0f0e6f8a11",
  "timestamp": "2025-01-01T00:00:00Z"
}
```

## Pagination

List endpoints take `skip` and `limit` query parameters.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development")
    ),
    modifiers(&BearerAuthAddon),
    tags(
        (name = "auth", description = "Registration, login and logout"),
        (name = "users", description = "Account management"),
        (name = "warehouses", description = "Warehouse management"),
        (name = "inventories", description = "Inventory items and statistics"),
        (name = "sell", description = "Sell transactions"),
        (name = "activity", description = "Audit trail"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::health::root,
        crate::handlers::health::health_check,

        // Auth
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,

        // Users
        crate::handlers::users::get_me,
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,

        // Warehouses
        crate::handlers::warehouses::create_warehouse,
        crate::handlers::warehouses::list_warehouses,
        crate::handlers::warehouses::get_warehouse,
        crate::handlers::warehouses::update_warehouse,
        crate::handlers::warehouses::delete_warehouse,

        // Inventories
        crate::handlers::inventory::get_stats,
        crate::handlers::inventory::get_warehouse_stats,
        crate::handlers::inventory::list_items,
        crate::handlers::inventory::create_item,
        crate::handlers::inventory::get_item,
        crate::handlers::inventory::update_item,
        crate::handlers::inventory::delete_item,
        crate::handlers::inventory::list_by_category,
        crate::handlers::inventory::search_items,
        crate::handlers::inventory::list_by_warehouse,
        crate::handlers::inventory::get_warehouse_item,
        crate::handlers::inventory::update_warehouse_item,
        crate::handlers::inventory::delete_warehouse_item,

        // Sell
        crate::handlers::sell::create_sale,
        crate::handlers::sell::list_sales,
        crate::handlers::sell::list_sales_for_warehouse,
        crate::handlers::sell::list_sales_for_item,

        // Activity
        crate::handlers::activity::list_activities,
        crate::handlers::activity::list_entity_activities,
    ),
    components(
        schemas(
            crate::entities::UserRole,
            crate::entities::ActivityType,
            crate::entities::WarehouseModel,
            crate::entities::SellTransactionModel,
            crate::entities::ActivityModel,

            crate::handlers::auth::AuthResponse,
            crate::handlers::auth::AuthUserData,
            crate::services::users::RegisterRequest,
            crate::services::users::LoginRequest,
            crate::services::users::UpdateUserRequest,
            crate::services::users::UserResponse,

            crate::services::warehouses::CreateWarehouseRequest,
            crate::services::warehouses::UpdateWarehouseRequest,

            crate::services::inventory::CreateInventoryRequest,
            crate::services::inventory::UpdateInventoryRequest,
            crate::services::inventory::InventoryItemResponse,
            crate::services::inventory::InventoryStats,

            crate::services::sales::CreateSaleRequest,
            crate::handlers::activity::ActivityListResponse,
            crate::handlers::health::RootResponse,
            crate::handlers::health::HealthResponse,

            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url(OPENAPI_JSON_PATH, ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from(OPENAPI_JSON_PATH).try_it_out_enabled(true))
}
