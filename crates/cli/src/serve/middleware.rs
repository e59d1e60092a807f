//! HTTP middleware: rate limiting and API key authentication.

use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::state::AppState;

/// Per-IP rate limiting, checked before routing.
pub(crate) async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let ip = addr.ip();
    match state.rate_limiter.check(ip).await {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            tracing::warn!(%ip, retry_after, "rate limit exceeded");
            let body = serde_json::json!({
                "error": "rate limit exceeded",
                "retry_after": retry_after,
            });
            (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
        }
    }
}

/// API key authentication.
///
/// If `RELAY_API_KEY` is set, all requests (except /health) must include
/// either `Authorization: Bearer <key>` or `X-API-Key: <key>`. The node's
/// callback requests therefore need the key too when it is enabled.
pub(crate) async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(request).await;
    };
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    match presented_key(request.headers()) {
        Some(key) if key == expected => next.run(request).await,
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "rejected request with invalid API key");
            super::json_error(StatusCode::FORBIDDEN, "invalid API key").into_response()
        }
        None => super::json_error(StatusCode::UNAUTHORIZED, "authentication required")
            .into_response(),
    }
}

/// A bearer token wins over `X-API-Key` when both are sent.
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "));
    bearer.or_else(|| headers.get("x-api-key").and_then(|v| v.to_str().ok()))
}
