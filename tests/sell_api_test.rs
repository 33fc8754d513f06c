//! Sell transactions: stock draw-down, rejection paths and the audit entry.

mod common;

use axum::http::{Method, StatusCode};
use common::{decimal_field, uuid_field, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

async fn stock_of(app: &TestApp, item: Uuid) -> i64 {
    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/inventories/{item}"),
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    body["quantity"].as_i64().expect("quantity")
}

async fn sell(app: &TestApp, token: &str, warehouse: Uuid, item: Uuid, quantity: i32) -> (StatusCode, Value) {
    app.call(
        Method::POST,
        "/api/v1/sell",
        Some(json!({
            "warehouse_id": warehouse,
            "inventory_item_id": item,
            "quantity": quantity,
            "description": "Counter sale"
        })),
        Some(token),
    )
    .await
}

#[tokio::test]
async fn sale_decrements_stock_and_prices_from_sell_price() {
    let app = TestApp::new().await;
    let warehouse = app.create_warehouse("Main Warehouse Jakarta").await;
    let item = app.create_item(warehouse, "SELL-1", 10).await;

    let (status, sale) = sell(&app, app.admin_token(), warehouse, item, 4).await;
    assert_eq!(status, StatusCode::CREATED, "{sale}");
    assert_eq!(sale["quantity"], 4);
    assert_eq!(uuid_field(&sale, "inventory_item_id"), item);
    assert_eq!(decimal_field(&sale, "unit_price"), dec!(15));
    assert_eq!(decimal_field(&sale, "total_price"), dec!(60));

    assert_eq!(stock_of(&app, item).await, 6);
}

#[tokio::test]
async fn selling_exactly_the_remaining_stock_reaches_zero() {
    let app = TestApp::new().await;
    let warehouse = app.create_warehouse("Warehouse Surabaya").await;
    let item = app.create_item(warehouse, "SELL-ALL", 3).await;

    let (status, _) = sell(&app, app.admin_token(), warehouse, item, 3).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(stock_of(&app, item).await, 0);
}

#[tokio::test]
async fn overselling_is_rejected_without_side_effects() {
    let app = TestApp::new().await;
    let warehouse = app.create_warehouse("Warehouse Bandung").await;
    let item = app.create_item(warehouse, "SELL-2", 3).await;

    let (status, body) = sell(&app, app.admin_token(), warehouse, item, 5).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Insufficient stock. Available: 3, Requested: 5");

    assert_eq!(stock_of(&app, item).await, 3);

    let (_, sales) = app
        .call(
            Method::GET,
            &format!("/api/v1/sell/inventory/{item}"),
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(sales, json!([]));

    let (_, activity) = app
        .call(
            Method::GET,
            "/api/v1/activity?activity_type=sell_transaction",
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(activity["total"], 0);
}

#[tokio::test]
async fn only_super_admins_can_sell() {
    let app = TestApp::new().await;
    let warehouse = app.create_warehouse("Warehouse Medan").await;
    let item = app.create_item(warehouse, "SELL-3", 10).await;
    let clerk = app.warehouse_user("clerk@example.com", warehouse).await;

    let (status, body) = sell(&app, &clerk, warehouse, item, 1).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "Only super admin users can create sell transactions"
    );

    // Role is checked before the payload
    let (status, _) = sell(&app, &clerk, warehouse, item, 0).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(stock_of(&app, item).await, 10);
}

#[tokio::test]
async fn zero_quantity_is_422_for_admins() {
    let app = TestApp::new().await;
    let warehouse = app.create_warehouse("Warehouse Makassar").await;
    let item = app.create_item(warehouse, "SELL-4", 10).await;

    let (status, _) = sell(&app, app.admin_token(), warehouse, item, 0).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn item_must_belong_to_the_warehouse() {
    let app = TestApp::new().await;
    let home = app.create_warehouse("Warehouse Semarang").await;
    let elsewhere = app.create_warehouse("Warehouse Denpasar").await;
    let item = app.create_item(home, "SELL-5", 10).await;

    let (status, body) = sell(&app, app.admin_token(), elsewhere, item, 1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        format!("Inventory item does not belong to warehouse {elsewhere}")
    );
    assert_eq!(stock_of(&app, item).await, 10);
}

#[tokio::test]
async fn unknown_warehouse_or_item_is_404() {
    let app = TestApp::new().await;
    let warehouse = app.create_warehouse("Warehouse Palembang").await;
    let item = app.create_item(warehouse, "SELL-6", 10).await;

    let (status, _) = sell(&app, app.admin_token(), Uuid::new_v4(), item, 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = sell(&app, app.admin_token(), warehouse, Uuid::new_v4(), 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sale_writes_exactly_one_activity() {
    let app = TestApp::new().await;
    let warehouse = app.create_warehouse("Warehouse Balikpapan").await;
    let item = app.create_item(warehouse, "SELL-7", 10).await;

    let (status, sale) = sell(&app, app.admin_token(), warehouse, item, 2).await;
    assert_eq!(status, StatusCode::CREATED);
    let sale_id = uuid_field(&sale, "id");

    let (status, feed) = app
        .call(
            Method::GET,
            &format!("/api/v1/activity/entity/sell_transaction/{sale_id}"),
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["total"], 1);
    let entry = &feed["data"][0];
    assert_eq!(entry["activity_type"], "sell_transaction");
    assert_eq!(entry["metadata"]["previous_stock"], 10);
    assert_eq!(entry["metadata"]["new_stock"], 8);
    assert_eq!(entry["metadata"]["quantity_change"], -2);

    // No separate stock adjustment entry for the item
    let (_, item_feed) = app
        .call(
            Method::GET,
            &format!("/api/v1/activity/entity/inventory/{item}"),
            None,
            Some(app.admin_token()),
        )
        .await;
    let types: Vec<_> = item_feed["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["activity_type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(types, vec!["inventory_created".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sales_never_oversell_or_error() {
    let app = TestApp::with_pool_size(8).await;
    let warehouse = app.create_warehouse("Rush Warehouse").await;
    let item = app.create_item(warehouse, "RUSH-1", 5).await;
    let token = app.admin_token().to_string();

    let attempts = (0..10).map(|_| sell(&app, &token, warehouse, item, 1));
    let results = futures::future::join_all(attempts).await;

    let sold = results
        .iter()
        .filter(|(status, _)| *status == StatusCode::CREATED)
        .count();
    assert_eq!(sold, 5, "{results:?}");
    for (status, body) in results.iter().filter(|(status, _)| *status != StatusCode::CREATED) {
        assert_eq!(*status, StatusCode::BAD_REQUEST, "{body}");
        assert!(body["message"]
            .as_str()
            .is_some_and(|m| m.starts_with("Insufficient stock. Available: 0")));
    }

    assert_eq!(stock_of(&app, item).await, 0);

    let (_, activity) = app
        .call(
            Method::GET,
            "/api/v1/activity?activity_type=sell_transaction",
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(activity["total"], 5);
}

#[tokio::test]
async fn sales_lists_are_scoped() {
    let app = TestApp::new().await;
    let first = app.create_warehouse("Scope A").await;
    let second = app.create_warehouse("Scope B").await;
    let first_item = app.create_item(first, "SC-A", 10).await;
    let second_item = app.create_item(second, "SC-B", 10).await;
    sell(&app, app.admin_token(), first, first_item, 1).await;
    sell(&app, app.admin_token(), second, second_item, 2).await;

    let (_, all) = app
        .call(Method::GET, "/api/v1/sell", None, Some(app.admin_token()))
        .await;
    assert_eq!(all.as_array().map(Vec::len), Some(2));

    let clerk = app.warehouse_user("scoped@example.com", first).await;
    let (status, mine) = app
        .call(Method::GET, "/api/v1/sell", None, Some(&clerk))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().map(Vec::len), Some(1));
    assert_eq!(uuid_field(&mine[0], "warehouse_id"), first);

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/v1/sell/warehouse/{second}"),
            None,
            Some(&clerk),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, theirs) = app
        .call(
            Method::GET,
            &format!("/api/v1/sell/inventory/{second_item}"),
            None,
            Some(&clerk),
        )
        .await;
    assert_eq!(theirs, json!([]));
}
