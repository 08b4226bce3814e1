//! Per-request correlation ids.
//!
//! The id arrives on the `x-request-id` header (or is generated here), is
//! scoped into a task-local for the duration of the request, and is echoed
//! back on the response. Error envelopes read it via [`current_request_id`].

use std::future::Future;

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("req-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

tokio::task_local! {
    static REQUEST_ID: RequestId;
}

/// Runs `fut` with the given request id visible to [`current_request_id`].
pub async fn scope_request_id<F: Future>(id: RequestId, fut: F) -> F::Output {
    REQUEST_ID.scope(id, fut).await
}

/// The request id of the task currently handling a request, if any.
pub fn current_request_id() -> Option<RequestId> {
    REQUEST_ID.try_with(|rid| rid.clone()).ok()
}

/// axum middleware: adopt or mint the request id, scope it, echo it back.
pub async fn propagate_request_id(request: Request, next: Next) -> Response {
    let rid = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(RequestId::new)
        .unwrap_or_else(RequestId::generate);

    let mut response = scope_request_id(rid.clone(), next.run(request)).await;

    if let Ok(value) = HeaderValue::from_str(rid.as_str()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}
