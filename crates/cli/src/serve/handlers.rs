//! Route handlers: health, run-dapp, contract callbacks, request status.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use relay_core::{InvocationReport, PipelineError, StorageError};
use serde::Deserialize;

use super::json_error;
use super::state::AppState;

/// Body of `POST /api/run-dapp`.
#[derive(Debug, Deserialize)]
pub(crate) struct RunDappRequest {
    smart_contract_hash: String,
    /// Port the caller's dapp listens on. Accepted for compatibility.
    #[serde(default)]
    port: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusQuery {
    req_id: Option<String>,
}

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": relay_core::VERSION,
    });
    (StatusCode::OK, Json(response))
}

/// POST /api/run-dapp
pub(crate) async fn handle_run_dapp(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RunDappRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return json_error(
                StatusCode::BAD_REQUEST,
                &format!("invalid request body: {}", rejection.body_text()),
            )
            .into_response()
        }
    };
    if request.smart_contract_hash.trim().is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "smart_contract_hash is required")
            .into_response();
    }
    if let Some(port) = &request.port {
        tracing::debug!(port = %port, "run-dapp caller port");
    }

    run_pipeline(&state, &request.smart_contract_hash).await
}

/// POST <callback_url> for a configured contract.
///
/// The node calls this when the contract's chain data changes. The body is
/// not needed; the route identifies the contract.
pub(crate) async fn handle_callback(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    match state.callbacks.get(uri.path()) {
        Some(contract) => {
            tracing::info!(route = %uri.path(), contract = %contract, "callback received");
            run_pipeline(&state, contract).await
        }
        None => json_error(StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

/// GET /request-status?req_id=<id>
pub(crate) async fn handle_request_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatusQuery>,
) -> Response {
    let Some(request_id) = query.req_id.filter(|id| !id.is_empty()) else {
        return json_error(StatusCode::BAD_REQUEST, "missing req_id query parameter")
            .into_response();
    };

    match state.orchestrator.query_status(&request_id).await {
        Ok(status) => {
            let body = serde_json::json!({
                "message": format!("Request Status: {}", status.code()),
                "status": status.code(),
                "state": status.as_str(),
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(StorageError::NotFound { .. }) => json_error(
            StatusCode::NOT_FOUND,
            &format!("request '{}' not found", request_id),
        )
        .into_response(),
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "status lookup failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()).into_response()
        }
    }
}

async fn run_pipeline(state: &AppState, contract: &str) -> Response {
    match state.orchestrator.invoke(contract).await {
        Ok(report) => (StatusCode::OK, Json(report_body(&report))).into_response(),
        Err(e) => pipeline_error_response(&e),
    }
}

fn report_body(report: &InvocationReport) -> serde_json::Value {
    serde_json::json!({
        "message": "DApp executed successfully",
        "data": report.outcome,
        "request_id": report.request_id,
        "state": report.status.as_str(),
        "skipped": report.skipped,
    })
}

pub(crate) fn error_status(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Fetch(_) | PipelineError::Invocation { .. } => StatusCode::BAD_GATEWAY,
        PipelineError::Decode(_) | PipelineError::UnsupportedOperation { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PipelineError::UnknownContract { .. } => StatusCode::NOT_FOUND,
        PipelineError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn pipeline_error_response(err: &PipelineError) -> Response {
    let body = serde_json::json!({
        "status": false,
        "stage": err.stage(),
        "message": err.to_string(),
    });
    (error_status(err), Json(body)).into_response()
}
