#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use oxiam_common::roles::{RolesRegistry, StaticRoles};
use oxiam_server::app;
use oxiam_server::config::ServerConfig;
use oxiam_server::fixtures::{self, ReferenceMap};
use oxiam_server::resources::UsersController;
use oxiam_server::state::AppState;
use oxiam_storage::entity_manager::EntityManager;
use oxiam_storage::store::UserStore;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
}

pub async fn build_test_context() -> Result<TestContext> {
    oxiam_common::id::init(1, 1);

    let temp_dir = tempfile::tempdir()?;
    let db_path = temp_dir.path().join("oxiam-test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let store = Arc::new(UserStore::new(&db_url, temp_dir.path()).await?);
    let entity_manager = Arc::new(EntityManager::new(store.connection()));
    let users = Arc::new(UsersController::new(store.clone(), entity_manager.clone()));

    let config = ServerConfig::default();

    let state = AppState {
        store,
        entity_manager,
        users,
        start_time: Utc::now(),
        config: Arc::new(config),
    };

    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        state,
        app,
    })
}

/// 跑一轮内置填充器，返回引用表。
pub async fn seed_fixtures(ctx: &TestContext) -> Result<ReferenceMap> {
    let roles: Arc<dyn RolesRegistry> = Arc::new(StaticRoles::default());
    fixtures::run_fixtures(&ctx.state.entity_manager, roles).await
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    let req_body = body.unwrap_or(Value::Null).to_string();
    let req = builder
        .body(Body::from(req_body))
        .expect("request should build");

    send(app, req).await
}

/// 同 `request_json`，但回传 `Allow` 响应头而不是追踪 ID（405 断言用）。
pub async fn request_json_allow(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.unwrap_or(Value::Null).to_string()))
        .expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let allow = resp
        .headers()
        .get("allow")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, allow)
}

pub async fn request_no_body(
    app: &axum::Router,
    method: &str,
    uri: &str,
) -> (StatusCode, Value, Option<String>) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");

    send(app, req).await
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value, Option<String>) {
    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub fn assert_ok_envelope(body: &Value) {
    assert_eq!(body["err_code"], 0, "unexpected envelope: {body}");
    assert!(
        body["trace_id"].as_str().is_some_and(|t| !t.is_empty()),
        "trace_id missing in envelope: {body}"
    );
}

pub fn assert_err_envelope(body: &Value, err_code: i32) {
    assert_eq!(body["err_code"], err_code, "unexpected envelope: {body}");
    assert!(
        body["err_msg"].as_str().is_some_and(|m| !m.is_empty()),
        "err_msg missing in envelope: {body}"
    );
}

pub fn decode_data<T: DeserializeOwned>(body: &Value) -> T {
    serde_json::from_value(body["data"].clone()).expect("data should decode")
}
