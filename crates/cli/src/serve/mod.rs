//! `dapp-relay serve` -- HTTP front end for the invocation pipeline.
//!
//! Security features:
//! - CORS headers on all responses (permissive, any origin)
//! - Per-IP rate limiting (default: 60 req/min, `RELAY_RATE_LIMIT`)
//! - Optional API key authentication via `RELAY_API_KEY`
//!
//! Endpoints:
//! - GET  /health                 - Server status (exempt from auth)
//! - POST /api/run-dapp           - Run the pipeline for `smart_contract_hash`
//! - POST <callback_url>          - Node callback for each configured contract
//! - GET  /request-status?req_id= - Ledger status of a request
//!
//! All responses use Content-Type: application/json.

mod handlers;
mod middleware;
mod state;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Json, Router};
use tower_http::cors::{Any, CorsLayer};

use self::handlers::{
    handle_callback, handle_health, handle_not_found, handle_request_status, handle_run_dapp,
};
use self::middleware::{auth_middleware, rate_limit_middleware};
use self::state::{AppState, RateLimiter};
use crate::app::Relay;

/// Maximum request body size: 1 MB.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Default rate limit: 60 requests per minute per IP.
const DEFAULT_RATE_LIMIT: u64 = 60;

/// Rate limit window duration in seconds (1 minute).
const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Start the HTTP server on the given port.
///
/// When TLS cert/key paths are provided (and the `tls` feature is enabled),
/// the server listens over HTTPS using `axum-server` with rustls.
pub(crate) async fn start_server(
    relay: Relay,
    port: u16,
    _tls_cert: Option<PathBuf>,
    _tls_key: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let rate_limit = std::env::var("RELAY_RATE_LIMIT")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RATE_LIMIT);

    let api_key = std::env::var("RELAY_API_KEY")
        .ok()
        .filter(|k| !k.is_empty());

    if api_key.is_some() {
        tracing::info!("API key authentication enabled");
    }
    tracing::info!(rate_limit, "per-IP rate limit (requests per minute)");

    let callbacks: HashMap<String, String> = relay
        .config
        .contracts
        .values()
        .map(|c| (c.callback_url.clone(), c.contract_hash.clone()))
        .collect();

    let state = Arc::new(AppState {
        orchestrator: relay.orchestrator.clone(),
        callbacks,
        rate_limiter: RateLimiter::new(rate_limit),
        api_key,
    });
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);

    #[cfg(feature = "tls")]
    if let (Some(cert_path), Some(key_path)) = (&_tls_cert, &_tls_key) {
        let config =
            axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path).await?;
        let socket_addr: std::net::SocketAddr = addr.parse()?;
        tracing::info!("dapp-relay listening on https://0.0.0.0:{}", port);
        axum_server::bind_rustls(socket_addr, config)
            .serve(app.into_make_service_with_connect_info::<std::net::SocketAddr>())
            .await?;
        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("dapp-relay listening on http://0.0.0.0:{}", port);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server shut down");
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/health", get(handle_health))
        .route("/api/run-dapp", post(handle_run_dapp))
        .route("/request-status", get(handle_request_status));
    for (route, contract) in &state.callbacks {
        tracing::info!(route = %route, contract = %contract, "serving contract callback");
        router = router.route(route, post(handle_callback));
    }

    router
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}
