use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::context::{self, RequestContext};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Outermost middleware: forwards or generates the request id and opens the
/// task-local context scope the rest of the pipeline runs inside. Must be
/// installed exactly once, outside the gates.
pub async fn request_context_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut response = context::scope(RequestContext::new(request_id.clone()), next.run(request)).await;

    // Echo the request id so clients and logs can correlate
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    response
}
