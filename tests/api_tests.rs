//! HTTP-level tests exercising the router, auth middleware, and the
//! client flow end to end.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use cardgate::config::Config;
use cardgate::db::Store;
use cardgate::state::SharedState;

async fn spawn_app() -> (SharedState, Router, String) {
    let mut config = Config::default();
    config.auth.jwt_secret = "test-secret".to_string();

    // Single connection so the in-memory database is shared.
    let store = Store::with_pool_options("sqlite::memory:", 1, 1)
        .await
        .expect("in-memory store should open");

    let app = store
        .create_app("test-app", None)
        .await
        .expect("app should be created");

    let state = SharedState::new(config, store);
    let router = cardgate::api::router(state.clone());

    (state, router, app.app_key)
}

fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register_and_login(router: &Router, app_key: &str, username: &str) -> String {
    let response = router
        .clone()
        .oneshot(post_json(
            "/api/auth/register",
            json!({"username": username, "password": "hunter22"}),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    login(router, app_key, username, "hunter22").await
}

async fn login(router: &Router, app_key: &str, username: &str, password: &str) -> String {
    let response = router
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            json!({
                "app_key": app_key,
                "username": username,
                "password": password,
                "device_id": "test-device",
            }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    body["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_endpoint_is_public() {
    let (_, router, _) = spawn_app().await;

    let response = router.oneshot(get("/api/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn auth_flow_and_middleware() {
    let (_, router, app_key) = spawn_app().await;

    // Protected route without a token.
    let response = router
        .clone()
        .oneshot(get("/api/auth/me", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = register_and_login(&router, &app_key, "alice").await;

    let response = router
        .clone()
        .oneshot(get("/api/auth/me", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], "alice");

    // Wrong password.
    let response = router
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            json!({
                "app_key": app_key,
                "username": "alice",
                "password": "wrong",
                "device_id": "test-device",
            }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Garbage token.
    let response = router
        .clone()
        .oneshot(get("/api/auth/me", Some("not-a-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_token_server_side() {
    let (_, router, app_key) = spawn_app().await;
    let token = register_and_login(&router, &app_key, "alice").await;

    let response = router
        .clone()
        .oneshot(post_json("/api/auth/logout", json!({}), Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The signature is still valid but the session is gone.
    let response = router
        .clone()
        .oneshot(get("/api/auth/me", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let (_, router, app_key) = spawn_app().await;

    let user_token = register_and_login(&router, &app_key, "alice").await;
    let response = router
        .clone()
        .oneshot(get("/api/admin/stats", Some(&user_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The migration seeds an admin account.
    let admin_token = login(&router, &app_key, "admin", "admin123").await;
    let response = router
        .clone()
        .oneshot(get("/api/admin/stats", Some(&admin_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["total_apps"], 1);
}

#[tokio::test]
async fn full_card_flow_over_http() {
    let (state, router, app_key) = spawn_app().await;

    let admin_token = login(&router, &app_key, "admin", "admin123").await;
    let user_token = register_and_login(&router, &app_key, "alice").await;

    let app = state.store.get_app_by_key(&app_key).await.unwrap().unwrap();

    // Admin mints a card granting wechat.
    let response = router
        .clone()
        .oneshot(post_json(
            "/api/admin/cards/generate",
            json!({
                "app_id": app.id,
                "count": 1,
                "valid_days": 30,
                "max_device_count": 2,
                "permissions": ["wechat"],
            }),
            Some(&admin_token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let card_key = body["data"][0].as_str().unwrap().to_string();

    // User binds it on the device the token was issued for.
    let response = router
        .clone()
        .oneshot(post_json(
            "/api/card/bind",
            json!({"card_key": card_key}),
            Some(&user_token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A fresh login now reports the card. It also replaces the stored
    // session, so the new token is used from here on.
    let response = router
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            json!({
                "app_key": app_key,
                "username": "alice",
                "password": "hunter22",
                "device_id": "test-device",
            }),
            None,
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["has_card"], true);
    let user_token = body["data"]["token"].as_str().unwrap().to_string();

    // Binding the same device twice conflicts.
    let response = router
        .clone()
        .oneshot(post_json(
            "/api/card/bind",
            json!({"card_key": card_key}),
            Some(&user_token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Check passes for the granted key and fails for another.
    let response = router
        .clone()
        .oneshot(post_json(
            "/api/permission/check",
            json!({"permission_key": "wechat"}),
            Some(&user_token),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["allowed"], true);

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/permission/check",
            json!({"permission_key": "ximalaya"}),
            Some(&user_token),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["allowed"], false);

    // Aggregate view lists the grant.
    let response = router
        .clone()
        .oneshot(get("/api/permission/my", Some(&user_token)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["permissions"], json!(["wechat"]));

    // Unbind by card id and the grant disappears.
    let response = router
        .clone()
        .oneshot(get("/api/card/my", Some(&user_token)))
        .await
        .unwrap();
    let body = body_json(response).await;
    let card_id = body["data"][0]["card_id"].as_i64().unwrap();

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/card/unbind",
            json!({"card_id": card_id}),
            Some(&user_token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/permission/check",
            json!({"permission_key": "wechat"}),
            Some(&user_token),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["allowed"], false);
    assert_eq!(body["data"]["reason"], "no card bound");
}
