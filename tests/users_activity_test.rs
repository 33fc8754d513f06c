mod common;

use axum::http::{Method, StatusCode};
use common::{uuid_field, TestApp, ADMIN_EMAIL};
use serde_json::json;

#[tokio::test]
async fn me_returns_the_caller_without_password_hash() {
    let app = TestApp::new().await;

    let (status, me) = app
        .call(Method::GET, "/api/v1/users/me", None, Some(app.admin_token()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], ADMIN_EMAIL);
    assert_eq!(me["role"], "super_admin");
    assert!(me.get("password_hash").is_none());
}

#[tokio::test]
async fn listing_users_requires_super_admin() {
    let app = TestApp::new().await;
    let (_, token) = app.register("plain@example.com", "secret1").await;

    let (status, _) = app
        .call(Method::GET, "/api/v1/users", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, users) = app
        .call(Method::GET, "/api/v1/users", None, Some(app.admin_token()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn warehouse_users_only_reach_their_own_account() {
    let app = TestApp::new().await;
    let (own_id, token) = app.register("one@example.com", "secret1").await;
    let (other_id, _) = app.register("two@example.com", "secret1").await;

    let (status, _) = app
        .call(Method::GET, &format!("/api/v1/users/{own_id}"), None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(Method::GET, &format!("/api/v1/users/{other_id}"), None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Not enough permissions");

    let (status, updated) = app
        .call(
            Method::PUT,
            &format!("/api/v1/users/{own_id}"),
            Some(json!({ "name": "Renamed Clerk" })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Renamed Clerk");

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/v1/users/{own_id}"),
            Some(json!({ "role": "super_admin" })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "Only super admin users can change role, warehouse or active status"
    );
}

#[tokio::test]
async fn admins_cannot_delete_themselves() {
    let app = TestApp::new().await;
    let (_, me) = app
        .call(Method::GET, "/api/v1/users/me", None, Some(app.admin_token()))
        .await;
    let admin_id = uuid_field(&me, "id");

    let (status, body) = app
        .call(
            Method::DELETE,
            &format!("/api/v1/users/{admin_id}"),
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot delete your own account");

    let (victim, _) = app.register("gone@example.com", "secret1").await;
    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/users/{victim}"),
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/v1/users/{victim}"),
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn activity_feed_uses_envelope_and_filters() {
    let app = TestApp::new().await;
    let warehouse = app.create_warehouse("Audit Warehouse").await;
    app.create_item(warehouse, "AUD-1", 4).await;

    let (status, feed) = app
        .call(Method::GET, "/api/v1/activity", None, Some(app.admin_token()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["success"], true);
    assert!(feed["error"].is_null());
    let total = feed["total"].as_u64().unwrap();
    assert!(total >= 2, "{feed}");

    let (_, created) = app
        .call(
            Method::GET,
            "/api/v1/activity?activity_type=inventory_created",
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(created["total"], 1);
    assert_eq!(created["data"][0]["entity_type"], "inventory");

    let (_, paged) = app
        .call(
            Method::GET,
            "/api/v1/activity?limit=1",
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(paged["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(paged["total"].as_u64(), Some(total));
}

#[tokio::test]
async fn warehouse_users_see_the_full_audit_trail() {
    let app = TestApp::new().await;
    let warehouse = app.create_warehouse("Shared Warehouse").await;
    let item = app.create_item(warehouse, "SHR-1", 4).await;
    let clerk = app.warehouse_user("watcher@example.com", warehouse).await;

    let (status, admin_feed) = app
        .call(Method::GET, "/api/v1/activity", None, Some(app.admin_token()))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, feed) = app
        .call(Method::GET, "/api/v1/activity", None, Some(&clerk))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["total"], admin_feed["total"]);
    assert!(feed["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|entry| entry["activity_type"] == "warehouse_created"));

    let (status, history) = app
        .call(
            Method::GET,
            &format!("/api/v1/activity/entity/inventory/{item}"),
            None,
            Some(&clerk),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["total"], 1);
    assert_eq!(history["data"][0]["activity_type"], "inventory_created");

    let (status, _) = app
        .call(Method::GET, "/api/v1/activity", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
