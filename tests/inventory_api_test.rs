//! Inventory CRUD, validation, warehouse scoping and statistics.

mod common;

use axum::http::{Method, StatusCode};
use common::{decimal_field, item_body, uuid_field, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn create_and_fetch_item_with_derived_fields() {
    let app = TestApp::new().await;
    let warehouse = app.create_warehouse("Main Warehouse Jakarta").await;

    let (status, created) = app
        .call(
            Method::POST,
            "/api/v1/inventories",
            Some(item_body(warehouse, "LAP-001", 3)),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let id = uuid_field(&created, "id");

    let (status, item) = app
        .call(
            Method::GET,
            &format!("/api/v1/inventories/{id}"),
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["sku"], "LAP-001");
    assert_eq!(item["quantity"], 3);
    // 3 on hand against a minimum of 5
    assert_eq!(item["is_low_stock"], true);
    assert_eq!(decimal_field(&item, "total_value"), dec!(30));
}

#[tokio::test]
async fn duplicate_sku_is_rejected() {
    let app = TestApp::new().await;
    let warehouse = app.create_warehouse("Warehouse Surabaya").await;
    app.create_item(warehouse, "DUP-1", 1).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/inventories",
            Some(item_body(warehouse, "DUP-1", 1)),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "SKU already exists");
}

#[tokio::test]
async fn price_and_stock_rules_are_422() {
    let app = TestApp::new().await;
    let warehouse = app.create_warehouse("Warehouse Bandung").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/inventories",
            Some(item_body(warehouse, "NEG-1", -1)),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"]
        .as_str()
        .is_some_and(|m| m.contains("Stocks cannot be negative")));

    let mut cheap = item_body(warehouse, "CHEAP-1", 1);
    cheap["sell_price"] = json!("9.00");
    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/inventories",
            Some(cheap),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"]
        .as_str()
        .is_some_and(|m| m.contains("Sell price must be higher than buy price")));
}

#[tokio::test]
async fn prices_beyond_column_precision_are_422() {
    let app = TestApp::new().await;
    let warehouse = app.create_warehouse("Warehouse Ambon").await;

    let mut huge = item_body(warehouse, "HUGE-1", 2_000_000_000);
    huge["buy_price"] = json!("100000000000.00");
    huge["sell_price"] = json!("200000000000.00");
    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/inventories",
            Some(huge),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"]
        .as_str()
        .is_some_and(|m| m.contains("Price cannot exceed")));

    // Largest accepted prices with a full shelf still list and summarize
    let mut top = item_body(warehouse, "TOP-1", i32::MAX);
    top["buy_price"] = json!("9999999999.98");
    top["sell_price"] = json!("9999999999.99");
    let (status, created) = app
        .call(
            Method::POST,
            "/api/v1/inventories",
            Some(top),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");

    let (status, list) = app
        .call(Method::GET, "/api/v1/inventories", None, Some(app.admin_token()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let (status, _) = app
        .call(
            Method::GET,
            "/api/v1/inventories/stats",
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn update_rechecks_merged_prices() {
    let app = TestApp::new().await;
    let warehouse = app.create_warehouse("Warehouse Medan").await;
    let item = app.create_item(warehouse, "UPD-1", 10).await;

    // Buy price alone would overtake the stored sell price of 15.00
    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/v1/inventories/{item}"),
            Some(json!({ "buy_price": "20.00" })),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, updated) = app
        .call(
            Method::PUT,
            &format!("/api/v1/inventories/{item}"),
            Some(json!({ "buy_price": "20.00", "sell_price": "25.00", "quantity": 12 })),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["quantity"], 12);
    assert_eq!(decimal_field(&updated, "sell_price"), dec!(25));
}

#[tokio::test]
async fn items_with_stock_cannot_be_deleted() {
    let app = TestApp::new().await;
    let warehouse = app.create_warehouse("Warehouse Makassar").await;
    let stocked = app.create_item(warehouse, "STK-1", 2).await;
    let empty = app.create_item(warehouse, "STK-0", 0).await;

    let (status, body) = app
        .call(
            Method::DELETE,
            &format!("/api/v1/inventories/{stocked}"),
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Cannot delete inventory item with non-zero stock quantity"
    );

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/inventories/{empty}"),
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn warehouse_user_only_sees_their_warehouse() {
    let app = TestApp::new().await;
    let mine = app.create_warehouse("Warehouse Semarang").await;
    let theirs = app.create_warehouse("Warehouse Yogyakarta").await;
    let own_item = app.create_item(mine, "MINE-1", 5).await;
    let foreign_item = app.create_item(theirs, "THEIRS-1", 5).await;
    let clerk = app.warehouse_user("clerk@example.com", mine).await;

    let (status, list) = app
        .call(Method::GET, "/api/v1/inventories", None, Some(&clerk))
        .await;
    assert_eq!(status, StatusCode::OK);
    let skus: Vec<_> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["sku"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(skus, vec!["MINE-1".to_string()]);

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/v1/inventories/{own_item}"),
            None,
            Some(&clerk),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Out-of-scope rows look exactly like missing ones
    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/inventories/{foreign_item}"),
            None,
            Some(&clerk),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Inventory item not found");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/inventories",
            Some(item_body(theirs, "SNEAK-1", 1)),
            Some(&clerk),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "Not enough permissions to access this warehouse"
    );

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/v1/inventories/warehouse/{theirs}"),
            None,
            Some(&clerk),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unassigned_warehouse_user_sees_nothing() {
    let app = TestApp::new().await;
    let warehouse = app.create_warehouse("Warehouse Balikpapan").await;
    app.create_item(warehouse, "BPN-1", 5).await;
    let (_, drifter) = app.register("drifter@example.com", "secret1").await;

    let (status, list) = app
        .call(Method::GET, "/api/v1/inventories", None, Some(&drifter))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn warehouse_scoped_routes_require_matching_warehouse() {
    let app = TestApp::new().await;
    let first = app.create_warehouse("Warehouse A").await;
    let second = app.create_warehouse("Warehouse B").await;
    let item = app.create_item(first, "WA-1", 7).await;

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/inventories/warehouse/{first}/{item}"),
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sku"], "WA-1");

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/v1/inventories/warehouse/{second}/{item}"),
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, updated) = app
        .call(
            Method::PUT,
            &format!("/api/v1/inventories/warehouse/{first}/{item}"),
            Some(json!({ "name": "Renamed" })),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Renamed");
}

#[tokio::test]
async fn category_and_search_filters() {
    let app = TestApp::new().await;
    let warehouse = app.create_warehouse("Warehouse Denpasar").await;
    app.create_item(warehouse, "ELEC-1", 5).await;

    let mut chair = item_body(warehouse, "FURN-1", 5);
    chair["name"] = json!("Office Chair Ergonomic");
    chair["category"] = json!("Furniture");
    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/inventories",
            Some(chair),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, furniture) = app
        .call(
            Method::GET,
            "/api/v1/inventories/category/Furniture",
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(furniture.as_array().map(Vec::len), Some(1));
    assert_eq!(furniture[0]["sku"], "FURN-1");

    let (_, found) = app
        .call(
            Method::GET,
            "/api/v1/inventories/search/Chair",
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(found.as_array().map(Vec::len), Some(1));
    assert_eq!(found[0]["name"], "Office Chair Ergonomic");

    let (_, listed) = app
        .call(
            Method::GET,
            &format!("/api/v1/inventories?warehouse_id={warehouse}&category=Electronics"),
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert_eq!(listed[0]["sku"], "ELEC-1");
}

#[tokio::test]
async fn stats_cover_scope() {
    let app = TestApp::new().await;
    let first = app.create_warehouse("Stats A").await;
    let second = app.create_warehouse("Stats B").await;
    app.create_item(first, "S-1", 2).await; // low: 2 <= 5
    app.create_item(first, "S-2", 5).await; // low: 5 <= 5
    app.create_item(second, "S-3", 10).await;

    let (status, stats) = app
        .call(
            Method::GET,
            "/api/v1/inventories/stats",
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_items"], 3);
    assert_eq!(stats["low_stock_items"], 2);
    assert_eq!(stats["total_categories"], 1);
    assert_eq!(stats["total_warehouses"], 2);
    assert_eq!(decimal_field(&stats, "total_value"), dec!(170));

    let (status, stats) = app
        .call(
            Method::GET,
            &format!("/api/v1/inventories/{second}/stats"),
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_items"], 1);
    assert_eq!(stats["total_warehouses"], 1);
    assert_eq!(decimal_field(&stats, "total_value"), dec!(100));

    let clerk = app.warehouse_user("stats@example.com", first).await;
    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/v1/inventories/{second}/stats"),
            None,
            Some(&clerk),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
