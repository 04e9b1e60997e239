//! Per-request correlation ids.
//!
//! Two middleware stages wrap every routed handler:
//!
//! 1. [`assign_request_id`] asks the injected [`RequestIdGenerator`] for a
//!    fresh id, stores a [`RequestContext`] in the request extensions and
//!    echoes the id in the `X-Request-ID` response header.
//! 2. [`log_request`] logs method, path and id before dispatch.
//!
//! Handlers take the context explicitly via `Extension<RequestContext>`.

use std::fmt;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use rand::Rng;
use tracing::{info, warn};

/// Response header carrying the correlation id.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Alphabet used by [`RequestIdGenerator::canonical`] (URL-safe, 64 symbols).
const ALPHABET: &[u8; 64] = b"useandom-26T198340PX75pxJACKVERYMINDBUSHWOLF_GQZbfghjklqvwyzrict";

/// Length of ids produced by [`RequestIdGenerator::canonical`].
pub const CANONICAL_LEN: usize = 21;

/// Source of correlation ids, injected at router construction.
#[derive(Clone)]
pub struct RequestIdGenerator(Arc<dyn Fn() -> String + Send + Sync>);

impl RequestIdGenerator {
    pub fn new(generate: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(generate))
    }

    /// Short random tokens over the nanoid alphabet.
    pub fn canonical() -> Self {
        Self::new(|| {
            let mut rng = rand::thread_rng();
            (0..CANONICAL_LEN)
                .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
                .collect()
        })
    }

    pub fn generate(&self) -> String {
        (self.0)()
    }
}

impl fmt::Debug for RequestIdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestIdGenerator").finish_non_exhaustive()
    }
}

/// Request-scoped data shared by the middleware stages and the handler.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub method: Method,
    pub path: String,
}

/// Stage 1: assign a correlation id and echo it on the response.
pub async fn assign_request_id(
    State(ids): State<RequestIdGenerator>,
    mut request: Request,
    next: Next,
) -> Response {
    let ctx = RequestContext {
        request_id: ids.generate(),
        method: request.method().clone(),
        path: request.uri().path().to_string(),
    };
    let request_id = ctx.request_id.clone();
    request.extensions_mut().insert(ctx);

    let mut response = next.run(request).await;

    match HeaderValue::from_str(&request_id) {
        Ok(value) => {
            response.headers_mut().insert(X_REQUEST_ID, value);
        }
        Err(_) => warn!(request_id = %request_id, "Request id is not a valid header value"),
    }
    response
}

/// Stage 2: log the request before dispatch.
pub async fn log_request(request: Request, next: Next) -> Response {
    if let Some(ctx) = request.extensions().get::<RequestContext>() {
        info!(
            method = %ctx.method,
            path = %ctx.path,
            request_id = %ctx.request_id,
            "request"
        );
    }
    next.run(request).await
}
