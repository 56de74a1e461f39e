//! Shared helper functions for integration tests

use axum::{
    body::Body,
    http::{self, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use blockpress::auth::JwtKeys;
use blockpress::config::AppConfig;
use blockpress::create_router;
use blockpress::models::{Role, User};
use blockpress::store::Store;

/// Builds the application in-process. The returned store handle shares state
/// with the router, so tests can seed and inspect documents directly.
pub fn create_test_app() -> (Router, Store) {
    let store = Store::new();
    let app = create_router(store.clone(), AppConfig::for_tests());
    (app, store)
}

pub async fn request(
    app: &Router,
    method: http::Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Registers a user through the API and returns their bearer token.
pub async fn register_user(app: &Router, name: &str, email: &str, role: &str) -> String {
    let response = request(
        app,
        http::Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "name": name,
            "email": email,
            "password": "secret123",
            "role": role,
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Admins cannot self-register, so tests seed them straight into the store
/// and sign a token with the test secret.
pub fn seed_admin(store: &Store) -> (Uuid, String) {
    let id = Uuid::new_v4();
    store
        .insert_user(User {
            id,
            name: "Admin".to_string(),
            email: format!("admin-{id}@test.invalid"),
            password: "unused".to_string(),
            role: Role::Admin,
            avatar: None,
            is_verified: true,
            verification_token: None,
            verification_expire: None,
            reset_password_token: None,
            reset_password_expire: None,
            created_at: Utc::now(),
        })
        .unwrap();
    let token = JwtKeys::new("test-secret", 1).sign(id).unwrap();
    (id, token)
}

pub async fn caller_id(app: &Router, token: &str) -> Uuid {
    let response = request(app, http::Method::GET, "/auth/me", Some(token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["data"]["id"].as_str().unwrap().parse().unwrap()
}

/// Creates a published post with one text block and one comment section,
/// returning the post document.
pub async fn create_test_post(app: &Router, token: &str, title: &str) -> Value {
    let response = request(
        app,
        http::Method::POST,
        "/posts",
        Some(token),
        Some(json!({
            "title": title,
            "status": "published",
            "contentBlocks": [
                { "blockType": "text", "data": { "text": "Hello readers" } },
                { "blockType": "commentSection", "data": { "commentSettings": {} } },
            ],
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let mut body = body_json(response).await;
    body["data"].take()
}

/// Block id of the first `commentSection` block on a post document.
pub fn comment_section_id(post: &Value) -> String {
    post["contentBlocks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["blockType"] == "commentSection")
        .unwrap()["blockId"]
        .as_str()
        .unwrap()
        .to_string()
}

pub fn post_id(post: &Value) -> String {
    post["id"].as_str().unwrap().to_string()
}

/// Posts a comment and returns the created node.
pub async fn add_comment(
    app: &Router,
    token: &str,
    post_id: &str,
    block_id: &str,
    text: &str,
    parent: Option<&str>,
) -> Value {
    let mut payload = json!({ "text": text });
    if let Some(parent) = parent {
        payload["parentComment"] = json!(parent);
    }
    let response = request(
        app,
        http::Method::POST,
        &format!("/posts/{post_id}/blocks/{block_id}/comments"),
        Some(token),
        Some(payload),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let mut body = body_json(response).await;
    body["data"].take()
}
