//! Integration tests for the todo REST API.
//!
//! Most tests drive the router in-process with `oneshot`; one binds a real
//! listener on a random port and talks to it over HTTP.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tower::ServiceExt;

use todo_service::error::StoreError;
use todo_service::request_id::RequestIdGenerator;
use todo_service::store::{LibSqlTodoStore, TodoStore};
use todo_service::todos::{Todo, TodoPatch, TodoState, todo_routes};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const REQUEST_ID: &str = "123";

/// Router over a fresh in-memory store and a fixed request id.
async fn test_app() -> Router {
    let store: Arc<dyn TodoStore> = Arc::new(LibSqlTodoStore::new_memory().await.unwrap());
    app_with_store(store)
}

fn app_with_store(store: Arc<dyn TodoStore>) -> Router {
    todo_routes(
        TodoState::new(store),
        RequestIdGenerator::new(|| REQUEST_ID.to_string()),
    )
}

/// Store whose every operation fails with a query error.
struct FailingStore;

#[async_trait]
impl TodoStore for FailingStore {
    async fn insert_or_replace(&self, _todo: &Todo) -> Result<(), StoreError> {
        Err(StoreError::Query("disk on fire".into()))
    }
    async fn get(&self, _id: i64) -> Result<Todo, StoreError> {
        Err(StoreError::Query("disk on fire".into()))
    }
    async fn get_all(&self) -> Result<Vec<Todo>, StoreError> {
        Err(StoreError::Query("disk on fire".into()))
    }
    async fn delete(&self, _id: i64) -> Result<(), StoreError> {
        Err(StoreError::Query("disk on fire".into()))
    }
    async fn patch(&self, _patch: &TodoPatch) -> Result<(), StoreError> {
        Err(StoreError::Query("disk on fire".into()))
    }
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>, json: bool) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if json {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
    app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).expect("invalid JSON from server")
}

fn request_id(response: &Response) -> Option<&str> {
    response
        .headers()
        .get("x-request-id")
        .map(|v| v.to_str().unwrap())
}

const TODO_1: &str = r#"{"id": 1, "title": "test", "description": "test", "completed": true}"#;

// ── Health ──────────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_ok_and_untagged() {
    let app = test_app().await;
    let response = send(&app, Method::GET, "/health", None, false).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(request_id(&response).is_none());
    assert!(body_text(response).await.is_empty());
}

// ── GET ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_all_on_empty_store_returns_empty_array() {
    let app = test_app().await;
    let response = send(&app, Method::GET, "/todos", None, false).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(request_id(&response), Some(REQUEST_ID));
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn get_missing_returns_404_with_message() {
    let app = test_app().await;
    let response = send(&app, Method::GET, "/todos/7", None, false).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "todo `7` not found");
}

#[tokio::test]
async fn get_with_bad_id_returns_400() {
    let app = test_app().await;
    let response = send(&app, Method::GET, "/todos/abc", None, false).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "invalid id: `abc`");
}

// ── PUT ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn put_requires_json_content_type() {
    let app = test_app().await;

    let response = send(&app, Method::PUT, "/todos/1", Some(TODO_1), false).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_text(response).await,
        "invalid header `Content-Type` value: got ``, use `application/json`"
    );

    let response = send(&app, Method::PUT, "/todos/1", Some(TODO_1), true).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(request_id(&response), Some(REQUEST_ID));
}

#[tokio::test]
async fn put_then_get_round_trips() {
    let app = test_app().await;
    send(&app, Method::PUT, "/todos/1", Some(TODO_1), true).await;

    let response = send(&app, Method::GET, "/todos/1", None, false).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(request_id(&response), Some(REQUEST_ID));
    assert_eq!(
        body_json(response).await,
        json!({"id": 1, "title": "test", "description": "test", "completed": true})
    );
}

#[tokio::test]
async fn put_with_mismatched_ids_returns_400() {
    let app = test_app().await;
    let response = send(
        &app,
        Method::PUT,
        "/todos/1",
        Some(r#"{"id": 2, "title": "t", "description": "d", "completed": false}"#),
        true,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_text(response).await,
        "id in path `1` and body `2` do not match"
    );
}

#[tokio::test]
async fn put_with_malformed_body_returns_400() {
    let app = test_app().await;
    let response = send(&app, Method::PUT, "/todos/1", Some("{not json"), true).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "failed to decode todo body");
}

#[tokio::test]
async fn put_replaces_existing_row() {
    let app = test_app().await;
    send(&app, Method::PUT, "/todos/1", Some(TODO_1), true).await;
    send(
        &app,
        Method::PUT,
        "/todos/1",
        Some(r#"{"id": 1, "title": "second"}"#),
        true,
    )
    .await;

    let response = send(&app, Method::GET, "/todos/1", None, false).await;
    assert_eq!(
        body_json(response).await,
        json!({"id": 1, "title": "second", "description": "", "completed": false})
    );
}

#[tokio::test]
async fn put_with_null_fields_stores_zero_values() {
    let app = test_app().await;
    let response = send(
        &app,
        Method::PUT,
        "/todos/1",
        Some(r#"{"id": 1, "title": "t", "description": null, "completed": null}"#),
        true,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, Method::GET, "/todos/1", None, false).await;
    assert_eq!(
        body_json(response).await,
        json!({"id": 1, "title": "t", "description": "", "completed": false})
    );
}

// ── PATCH ───────────────────────────────────────────────────────────

#[tokio::test]
async fn patch_with_only_id_returns_no_fields_message() {
    let app = test_app().await;
    send(&app, Method::PUT, "/todos/1", Some(TODO_1), true).await;

    let response = send(&app, Method::PATCH, "/todos/1", Some(r#"{"id": 1}"#), true).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "no fields to update");
}

#[tokio::test]
async fn patch_null_description_resets_only_that_field() {
    let app = test_app().await;
    send(&app, Method::PUT, "/todos/1", Some(TODO_1), true).await;

    let response = send(
        &app,
        Method::PATCH,
        "/todos/1",
        Some(r#"{"id": 1, "description": null}"#),
        true,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, Method::GET, "/todos/1", None, false).await;
    assert_eq!(
        body_json(response).await,
        json!({"id": 1, "title": "test", "description": "", "completed": true})
    );
}

#[tokio::test]
async fn patch_sets_title() {
    let app = test_app().await;
    send(&app, Method::PUT, "/todos/1", Some(TODO_1), true).await;

    let response = send(
        &app,
        Method::PATCH,
        "/todos/1",
        Some(r#"{"id": 1, "title": "renamed"}"#),
        true,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, Method::GET, "/todos/1", None, false).await;
    assert_eq!(body_json(response).await["title"], "renamed");
}

#[tokio::test]
async fn patch_with_mismatched_ids_returns_400() {
    let app = test_app().await;
    let response = send(
        &app,
        Method::PATCH,
        "/todos/1",
        Some(r#"{"id": 2, "title": "x"}"#),
        true,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_with_wrong_field_type_returns_400() {
    let app = test_app().await;
    let response = send(
        &app,
        Method::PATCH,
        "/todos/1",
        Some(r#"{"id": 1, "completed": "yes"}"#),
        true,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "completed is not a boolean");
}

#[tokio::test]
async fn patch_requires_json_content_type() {
    let app = test_app().await;
    let response = send(
        &app,
        Method::PATCH,
        "/todos/1",
        Some(r#"{"id": 1, "title": "x"}"#),
        false,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_unknown_id_succeeds() {
    let app = test_app().await;
    let response = send(
        &app,
        Method::PATCH,
        "/todos/99",
        Some(r#"{"id": 99, "title": "x"}"#),
        true,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, Method::GET, "/todos/99", None, false).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ── DELETE ──────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_missing_then_get_is_404() {
    let app = test_app().await;

    let response = send(&app, Method::DELETE, "/todos/1", None, false).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.is_empty());

    let response = send(&app, Method::GET, "/todos/1", None, false).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, Method::GET, "/todos", None, false).await;
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn delete_existing_removes_it() {
    let app = test_app().await;
    send(&app, Method::PUT, "/todos/1", Some(TODO_1), true).await;

    let response = send(&app, Method::DELETE, "/todos/1", None, false).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, Method::GET, "/todos/1", None, false).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ── Storage failures ────────────────────────────────────────────────

#[tokio::test]
async fn storage_failures_return_generic_500() {
    let app = app_with_store(Arc::new(FailingStore));

    let cases = [
        (Method::GET, "/todos", None),
        (Method::GET, "/todos/1", None),
        (Method::PUT, "/todos/1", Some(TODO_1)),
        (Method::PATCH, "/todos/1", Some(r#"{"id": 1, "title": "x"}"#)),
        (Method::DELETE, "/todos/1", None),
    ];

    for (method, uri, body) in cases {
        let response = send(&app, method.clone(), uri, body, body.is_some()).await;
        assert_eq!(
            response.status(),
            StatusCode::INTERNAL_SERVER_ERROR,
            "{method} {uri}"
        );
        assert_eq!(request_id(&response), Some(REQUEST_ID));
        assert_eq!(body_text(response).await, "Internal Server Error");
    }
}

// ── Correlation ids ─────────────────────────────────────────────────

#[tokio::test]
async fn each_request_gets_its_own_generated_id() {
    let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let ids = {
        let counter = Arc::clone(&counter);
        RequestIdGenerator::new(move || {
            let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            format!("req-{n}")
        })
    };
    let store: Arc<dyn TodoStore> = Arc::new(LibSqlTodoStore::new_memory().await.unwrap());
    let app = todo_routes(TodoState::new(store), ids);

    let first = send(&app, Method::GET, "/todos", None, false).await;
    let second = send(&app, Method::GET, "/todos/1", None, false).await;
    let health = send(&app, Method::GET, "/health", None, false).await;

    assert_eq!(request_id(&first), Some("req-0"));
    assert_eq!(request_id(&second), Some("req-1"));
    assert!(request_id(&health).is_none());
    assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 2);
}

// ── Real server ─────────────────────────────────────────────────────

#[tokio::test]
async fn serves_over_tcp() {
    timeout(TEST_TIMEOUT, async {
        let app = test_app().await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::new();
        let base = format!("http://127.0.0.1:{port}");

        let resp = client
            .put(format!("{base}/todos/5"))
            .header("Content-Type", "application/json")
            .body(r#"{"id": 5, "title": "over tcp", "description": "", "completed": false}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);

        let resp = client.get(format!("{base}/todos")).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(
            resp.headers().get("x-request-id").unwrap().to_str().unwrap(),
            REQUEST_ID
        );
        let todos: Vec<Todo> = serde_json::from_str(&resp.text().await.unwrap()).unwrap();
        assert_eq!(todos, vec![Todo::new(5, "over tcp", "")]);
    })
    .await
    .expect("test timed out");
}
