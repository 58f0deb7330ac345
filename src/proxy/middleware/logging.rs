use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

/// Per-request log line with a correlation id.
pub async fn request_log_middleware(request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().simple().to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    tracing::debug!(
        %request_id,
        %method,
        %path,
        status = %response.status(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request completed"
    );
    response
}
