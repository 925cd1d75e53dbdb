//! HTTP middleware (404 handler)

use axum::extract::Request;
use axum::response::IntoResponse;

use crate::api::types::ApiError;

/// Handle 404 Not Found with logging
///
/// Only method and path are logged; headers and bodies may carry identity
/// headers, cookies or passwords.
pub async fn handle_404(req: Request) -> impl IntoResponse {
    tracing::debug!(method = %req.method(), path = %req.uri().path(), "[404]");
    ApiError::NotFound {
        code: "NOT_FOUND".to_string(),
        message: format!("No route for {}", req.uri().path()),
    }
}
