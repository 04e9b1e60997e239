//! REST endpoints for todos.
//!
//! | Method | Path          | Action                 |
//! |--------|---------------|------------------------|
//! | GET    | `/health`     | liveness, empty 200    |
//! | GET    | `/todos`      | list all               |
//! | GET    | `/todos/{id}` | get one                |
//! | PUT    | `/todos/{id}` | upsert (full replace)  |
//! | PATCH  | `/todos/{id}` | partial update         |
//! | DELETE | `/todos/{id}` | delete (idempotent)    |
//!
//! Error bodies are plain text. Internal failures are logged with the
//! request id and answered with the generic 500 phrase.

use std::fmt;
use std::sync::Arc;

use axum::{
    Extension, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tracing::error;

use super::model::Todo;
use super::patch::TodoPatch;
use crate::error::StoreError;
use crate::request_id::{RequestContext, RequestIdGenerator, assign_request_id, log_request};
use crate::store::TodoStore;

/// The only media type accepted on PUT and PATCH bodies.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Shared state for todo routes.
#[derive(Clone)]
pub struct TodoState {
    pub store: Arc<dyn TodoStore>,
}

impl TodoState {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self { store }
    }
}

/// Build the router. `/health` bypasses request-id assignment and logging.
pub fn todo_routes(state: TodoState, ids: RequestIdGenerator) -> Router {
    let todos = Router::new()
        .route("/todos", get(get_all))
        .route(
            "/todos/{id}",
            get(get_one).put(upsert).patch(patch).delete(delete),
        )
        .route_layer(middleware::from_fn(log_request))
        .route_layer(middleware::from_fn_with_state(ids, assign_request_id))
        .with_state(state);

    Router::new().route("/health", get(health)).merge(todos)
}

// ── Errors ──────────────────────────────────────────────────────────────

/// Error returned by a handler, rendered as a plain-text response.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal,
}

impl ApiError {
    /// Log an unexpected failure against the request and hide its detail.
    fn internal(ctx: &RequestContext, err: impl fmt::Display) -> Self {
        error!(
            error = %err,
            method = %ctx.method,
            path = %ctx.path,
            request_id = %ctx.request_id,
            "Internal Server Error"
        );
        ApiError::Internal
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            ApiError::Internal => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let phrase = status.canonical_reason().unwrap_or("Internal Server Error");
                (status, phrase).into_response()
            }
        }
    }
}

// ── Preconditions ───────────────────────────────────────────────────────

fn require_json_content_type(headers: &HeaderMap) -> Result<(), ApiError> {
    let got = headers
        .get(header::CONTENT_TYPE)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .unwrap_or_default();

    if got != CONTENT_TYPE_JSON {
        return Err(ApiError::BadRequest(format!(
            "invalid header `Content-Type` value: got `{got}`, use `{CONTENT_TYPE_JSON}`"
        )));
    }
    Ok(())
}

/// Parse the `{id}` path segment.
pub fn parse_todo_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid id: `{raw}`")))
}

fn check_ids_match(path_id: i64, body_id: i64) -> Result<(), ApiError> {
    if path_id != body_id {
        return Err(ApiError::BadRequest(format!(
            "id in path `{path_id}` and body `{body_id}` do not match"
        )));
    }
    Ok(())
}

fn json_response<T: Serialize>(ctx: &RequestContext, data: &T) -> Result<Response, ApiError> {
    let body = serde_json::to_vec(data).map_err(|e| ApiError::internal(ctx, e))?;
    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON))],
        body,
    )
        .into_response())
}

// ── Handlers ────────────────────────────────────────────────────────────

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn get_all(
    State(state): State<TodoState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response, ApiError> {
    let todos = state
        .store
        .get_all()
        .await
        .map_err(|e| ApiError::internal(&ctx, e))?;
    json_response(&ctx, &todos)
}

async fn get_one(
    State(state): State<TodoState>,
    Extension(ctx): Extension<RequestContext>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_todo_id(&raw_id)?;

    match state.store.get(id).await {
        Ok(todo) => json_response(&ctx, &todo),
        Err(e @ StoreError::NotFound { .. }) => Err(ApiError::NotFound(e.to_string())),
        Err(e) => Err(ApiError::internal(&ctx, e)),
    }
}

async fn upsert(
    State(state): State<TodoState>,
    Extension(ctx): Extension<RequestContext>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    require_json_content_type(&headers)?;
    let id = parse_todo_id(&raw_id)?;

    let todo: Todo = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("failed to decode todo body".to_string()))?;
    check_ids_match(id, todo.id)?;

    state
        .store
        .insert_or_replace(&todo)
        .await
        .map_err(|e| ApiError::internal(&ctx, e))?;
    Ok(StatusCode::OK)
}

/// Partial update. `{"id": 1, "title": "x"}` only touches the title;
/// `{"id": 1, "completed": null}` resets completed to false.
async fn patch(
    State(state): State<TodoState>,
    Extension(ctx): Extension<RequestContext>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    require_json_content_type(&headers)?;
    let id = parse_todo_id(&raw_id)?;

    let patch = TodoPatch::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    check_ids_match(id, patch.id)?;

    match state.store.patch(&patch).await {
        Ok(()) => Ok(StatusCode::OK),
        Err(e @ StoreError::NoFieldsToUpdate) => Err(ApiError::BadRequest(e.to_string())),
        Err(e) => Err(ApiError::internal(&ctx, e)),
    }
}

async fn delete(
    State(state): State<TodoState>,
    Extension(ctx): Extension<RequestContext>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_todo_id(&raw_id)?;

    state
        .store
        .delete(id)
        .await
        .map_err(|e| ApiError::internal(&ctx, e))?;
    Ok(StatusCode::OK)
}
