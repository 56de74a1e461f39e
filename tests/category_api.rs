mod common;

use axum::http::{Method, StatusCode};
use common::helpers::{body_json, create_test_app, register_user, request, seed_admin};
use serde_json::json;

async fn create_category(
    app: &axum::Router,
    token: &str,
    name: &str,
) -> serde_json::Value {
    let response = request(
        app,
        Method::POST,
        "/categories",
        Some(token),
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let mut body = body_json(response).await;
    body["data"].take()
}

#[tokio::test]
async fn admin_creates_category_with_derived_slug() {
    let (app, store) = create_test_app();
    let (_id, admin) = seed_admin(&store);

    let category = create_category(&app, &admin, "Systems Programming").await;
    assert_eq!(category["slug"], json!("systems-programming"));
}

#[tokio::test]
async fn non_admins_cannot_mutate_categories() {
    let (app, _store) = create_test_app();
    let publisher = register_user(&app, "Ada", "ada@test.invalid", "publisher").await;

    let response = request(
        &app,
        Method::POST,
        "/categories",
        Some(&publisher),
        Some(json!({ "name": "Forbidden" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn duplicate_names_conflict_case_insensitively() {
    let (app, store) = create_test_app();
    let (_id, admin) = seed_admin(&store);
    create_category(&app, &admin, "Rust").await;

    let response = request(
        &app,
        Method::POST,
        "/categories",
        Some(&admin),
        Some(json!({ "name": "rust" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn list_is_public_and_name_sorted() {
    let (app, store) = create_test_app();
    let (_id, admin) = seed_admin(&store);
    create_category(&app, &admin, "Zig").await;
    create_category(&app, &admin, "Ada").await;

    let response = request(&app, Method::GET, "/categories", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], json!(2));
    assert_eq!(body["data"][0]["name"], json!("Ada"));
    assert_eq!(body["data"][1]["name"], json!("Zig"));
}

#[tokio::test]
async fn rename_re_derives_the_slug() {
    let (app, store) = create_test_app();
    let (_id, admin) = seed_admin(&store);
    let category = create_category(&app, &admin, "Old Name").await;
    let id = category["id"].as_str().unwrap();

    let response = request(
        &app,
        Method::PUT,
        &format!("/categories/{id}"),
        Some(&admin),
        Some(json!({ "name": "New Name" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["slug"], json!("new-name"));
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
    let (app, store) = create_test_app();
    let (_id, admin) = seed_admin(&store);
    let category = create_category(&app, &admin, "Ephemeral").await;
    let id = category["id"].as_str().unwrap();

    let response = request(
        &app,
        Method::DELETE,
        &format!("/categories/{id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = request(&app, Method::GET, &format!("/categories/{id}"), None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn category_post_listing_filters_by_membership() {
    let (app, store) = create_test_app();
    let (_id, admin) = seed_admin(&store);
    let publisher = register_user(&app, "Ada", "ada@test.invalid", "publisher").await;
    let rust = create_category(&app, &admin, "Rust").await;
    let go = create_category(&app, &admin, "Go").await;

    let response = request(
        &app,
        Method::POST,
        "/posts",
        Some(&publisher),
        Some(json!({ "title": "On Ownership", "categories": [rust["id"]] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = request(
        &app,
        Method::POST,
        "/posts",
        Some(&publisher),
        Some(json!({ "title": "On Channels", "categories": [go["id"]] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let rust_id = rust["id"].as_str().unwrap();
    let response = request(
        &app,
        Method::GET,
        &format!("/categories/{rust_id}/posts"),
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["data"][0]["title"], json!("On Ownership"));
    assert_eq!(body["data"][0]["categories"][0]["name"], json!("Rust"));
}

#[tokio::test]
async fn unknown_category_post_listing_is_not_found() {
    let (app, _store) = create_test_app();
    let response = request(
        &app,
        Method::GET,
        &format!("/categories/{}/posts", uuid::Uuid::new_v4()),
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
