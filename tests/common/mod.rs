#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use inventory_api::{build_router, config::AppConfig, db, seed, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const ADMIN_EMAIL: &str = "admin@satek.com";
pub const ADMIN_PASSWORD: &str = "admin1234";

/// Full application over a throwaway SQLite file with the super admin seeded.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    admin_token: String,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_pool_size(1).await
    }

    /// Same as [`new`](Self::new) with `connections` pooled connections, for
    /// tests that need requests to reach the database concurrently.
    pub async fn with_pool_size(connections: u32) -> Self {
        let dir = tempfile::tempdir().expect("temp dir for test database");
        let db_path = dir.path().join("inventory_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            60,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = connections;
        cfg.db_min_connections = 1;
        cfg.seed_admin_email = ADMIN_EMAIL.to_string();
        cfg.seed_admin_password = ADMIN_PASSWORD.to_string();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        seed::seed_database(db_arc.clone(), &cfg, false)
            .await
            .expect("seed super admin");

        let state = AppState::new(db_arc, cfg);
        let router = build_router(state.clone());

        let mut app = Self {
            router,
            state,
            admin_token: String::new(),
            _dir: dir,
        };
        app.admin_token = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        app
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Same as [`request`](Self::request) but returns status and decoded body.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, token).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/auth/login",
                Some(json!({ "email": email, "password": password })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["data"]["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    /// Registers a warehouse user; returns (user id, token).
    pub async fn register(&self, email: &str, password: &str) -> (Uuid, String) {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/auth/register",
                Some(json!({ "email": email, "name": "Test Clerk", "password": password })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        let id = uuid_field(&body["data"], "id");
        let token = body["data"]["token"]
            .as_str()
            .expect("token in register response")
            .to_string();
        (id, token)
    }

    /// Registers a user and assigns them to `warehouse_id`; returns their token.
    pub async fn warehouse_user(&self, email: &str, warehouse_id: Uuid) -> String {
        let (user_id, token) = self.register(email, "secret1").await;
        let (status, body) = self
            .call(
                Method::PUT,
                &format!("/api/v1/users/{user_id}"),
                Some(json!({ "warehouse_id": warehouse_id })),
                Some(self.admin_token()),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "assigning warehouse failed: {body}");
        token
    }

    pub async fn create_warehouse(&self, name: &str) -> Uuid {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/warehouses",
                Some(json!({ "name": name, "location": "Jakarta, Indonesia" })),
                Some(self.admin_token()),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create warehouse failed: {body}");
        uuid_field(&body, "id")
    }

    pub async fn create_item(&self, warehouse_id: Uuid, sku: &str, quantity: i32) -> Uuid {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/inventories",
                Some(item_body(warehouse_id, sku, quantity)),
                Some(self.admin_token()),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create item failed: {body}");
        uuid_field(&body, "id")
    }
}

/// Body for a valid item: buy 10.00, sell 15.00, minimum stock 5
pub fn item_body(warehouse_id: Uuid, sku: &str, quantity: i32) -> Value {
    json!({
        "warehouse_id": warehouse_id,
        "name": format!("Item {sku}"),
        "sku": sku,
        "description": "Test item",
        "quantity": quantity,
        "buy_price": "10.00",
        "sell_price": "15.00",
        "category": "Electronics",
        "min_stock_level": 5
    })
}

pub async fn response_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json response")
}

pub fn uuid_field(value: &Value, field: &str) -> Uuid {
    value[field]
        .as_str()
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .unwrap_or_else(|| panic!("missing uuid field {field} in {value}"))
}

/// Decimals may come back as strings or numbers depending on the backend
pub fn decimal_field(value: &Value, field: &str) -> rust_decimal::Decimal {
    use std::str::FromStr;

    match &value[field] {
        Value::String(raw) => rust_decimal::Decimal::from_str(raw).expect("decimal string"),
        Value::Number(num) => {
            rust_decimal::Decimal::from_str(&num.to_string()).expect("decimal number")
        }
        other => panic!("field {field} is not a decimal: {other}"),
    }
}
