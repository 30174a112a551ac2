//! API Handlers
//!
//! Request handlers for the HTTP API. Ledger errors map to status codes
//! through their [`ErrorKind`]; everything else is a 400 (bad input) or
//! 500 (service failure).

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use log::error;

use obscura_account::Address;
use obscura_compute::{DevEngine, OracleCallback};
use obscura_handle::CiphertextHandle;

use super::types::*;
use crate::error::{ErrorKind, LedgerError};
use crate::ledger::LedgerService;

// ============================================================================
// Shared State
// ============================================================================

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<LedgerService>,
    /// Present in dev mode only; backs the /dev endpoints
    pub dev_engine: Option<Arc<DevEngine>>,
    pub dev_mode: bool,
    pub start_time: std::time::Instant,
}

// ============================================================================
// Helpers
// ============================================================================

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::Availability => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::RateLimit => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::State => StatusCode::CONFLICT,
        ErrorKind::Integrity => StatusCode::BAD_REQUEST,
    }
}

fn code_for(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Authorization => "UNAUTHORIZED",
        ErrorKind::Availability => "UNAVAILABLE",
        ErrorKind::RateLimit => "RATE_LIMITED",
        ErrorKind::State => "STATE_CONFLICT",
        ErrorKind::Integrity => "INTEGRITY",
    }
}

fn ledger_error(err: LedgerError) -> axum::response::Response {
    let kind = err.kind();
    (
        status_for(kind),
        Json(ErrorResponse::new(err.to_string(), code_for(kind))),
    )
        .into_response()
}

fn service_error(err: anyhow::Error) -> axum::response::Response {
    error!("ledger service call failed: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::internal("ledger service unavailable")),
    )
        .into_response()
}

fn parse_address(s: &str) -> Result<Address, axum::response::Response> {
    Address::from_str(s).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request("Invalid address format")),
        )
            .into_response()
    })
}

fn parse_handle(s: &str) -> Result<CiphertextHandle, axum::response::Response> {
    match hex::decode(s) {
        Ok(bytes) if !bytes.is_empty() => Ok(CiphertextHandle::new(bytes)),
        _ => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request("Invalid handle encoding")),
        )
            .into_response()),
    }
}

fn parse_hex(s: &str, what: &str) -> Result<Vec<u8>, axum::response::Response> {
    hex::decode(s).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request(format!("Invalid {what} encoding"))),
        )
            .into_response()
    })
}

/// Collapse the two error layers of a service call into one response.
macro_rules! unwrap_call {
    ($call:expr) => {
        match $call {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => return ledger_error(err),
            Err(err) => return service_error(err),
        }
    };
}

// ============================================================================
// Health & Status
// ============================================================================

/// Health check endpoint
pub async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();

    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: uptime,
    })
}

/// Ledger-wide counters
pub async fn status(State(state): State<ApiState>) -> impl IntoResponse {
    match state.service.stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(err) => service_error(err),
    }
}

/// Retained audit log
pub async fn events(State(state): State<ApiState>) -> impl IntoResponse {
    match state.service.events().await {
        Ok(events) => Json(events).into_response(),
        Err(err) => service_error(err),
    }
}

/// Batch metadata by id
pub async fn get_batch(
    State(state): State<ApiState>,
    Path(batch_id): Path<u64>,
) -> impl IntoResponse {
    match state.service.batch_info(batch_id).await {
        Ok(Some(info)) => Json(info).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::not_found("Unknown batch")),
        )
            .into_response(),
        Err(err) => service_error(err),
    }
}

/// Decryption request status by id
pub async fn get_request(
    State(state): State<ApiState>,
    Path(request_id): Path<u64>,
) -> impl IntoResponse {
    match state.service.request_context(request_id).await {
        Ok(Some(context)) => Json(RequestContextResponse {
            request_id,
            context,
        })
        .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::not_found("Unknown decryption request")),
        )
            .into_response(),
        Err(err) => service_error(err),
    }
}

// ============================================================================
// Administration
// ============================================================================

pub async fn transfer_ownership(
    State(state): State<ApiState>,
    Json(req): Json<TransferOwnershipRequest>,
) -> impl IntoResponse {
    let caller = match parse_address(&req.caller) {
        Ok(addr) => addr,
        Err(resp) => return resp,
    };
    let new_owner = match parse_address(&req.new_owner) {
        Ok(addr) => addr,
        Err(resp) => return resp,
    };

    unwrap_call!(state.service.transfer_ownership(caller, new_owner).await);
    Json(AckResponse { accepted: true }).into_response()
}

pub async fn add_provider(
    State(state): State<ApiState>,
    Json(req): Json<ProviderRequest>,
) -> impl IntoResponse {
    let caller = match parse_address(&req.caller) {
        Ok(addr) => addr,
        Err(resp) => return resp,
    };
    let provider = match parse_address(&req.provider) {
        Ok(addr) => addr,
        Err(resp) => return resp,
    };

    unwrap_call!(state.service.add_provider(caller, provider).await);
    Json(AckResponse { accepted: true }).into_response()
}

pub async fn remove_provider(
    State(state): State<ApiState>,
    Json(req): Json<ProviderRequest>,
) -> impl IntoResponse {
    let caller = match parse_address(&req.caller) {
        Ok(addr) => addr,
        Err(resp) => return resp,
    };
    let provider = match parse_address(&req.provider) {
        Ok(addr) => addr,
        Err(resp) => return resp,
    };

    unwrap_call!(state.service.remove_provider(caller, provider).await);
    Json(AckResponse { accepted: true }).into_response()
}

pub async fn set_paused(
    State(state): State<ApiState>,
    Json(req): Json<SetPausedRequest>,
) -> impl IntoResponse {
    let caller = match parse_address(&req.caller) {
        Ok(addr) => addr,
        Err(resp) => return resp,
    };

    unwrap_call!(state.service.set_paused(caller, req.paused).await);
    Json(AckResponse { accepted: true }).into_response()
}

pub async fn set_cooldown(
    State(state): State<ApiState>,
    Json(req): Json<SetCooldownRequest>,
) -> impl IntoResponse {
    let caller = match parse_address(&req.caller) {
        Ok(addr) => addr,
        Err(resp) => return resp,
    };

    unwrap_call!(state.service.set_cooldown(caller, req.seconds).await);
    Json(AckResponse { accepted: true }).into_response()
}

// ============================================================================
// Batch Lifecycle
// ============================================================================

pub async fn open_batch(
    State(state): State<ApiState>,
    Json(req): Json<BatchLifecycleRequest>,
) -> impl IntoResponse {
    let caller = match parse_address(&req.caller) {
        Ok(addr) => addr,
        Err(resp) => return resp,
    };

    let batch_id = unwrap_call!(state.service.open_batch(caller).await);
    Json(BatchLifecycleResponse { batch_id }).into_response()
}

pub async fn close_batch(
    State(state): State<ApiState>,
    Json(req): Json<BatchLifecycleRequest>,
) -> impl IntoResponse {
    let caller = match parse_address(&req.caller) {
        Ok(addr) => addr,
        Err(resp) => return resp,
    };

    let batch_id = unwrap_call!(state.service.close_batch(caller).await);
    Json(BatchLifecycleResponse { batch_id }).into_response()
}

// ============================================================================
// Submission & Analysis
// ============================================================================

pub async fn submit(
    State(state): State<ApiState>,
    Json(req): Json<SubmitRequest>,
) -> impl IntoResponse {
    let caller = match parse_address(&req.caller) {
        Ok(addr) => addr,
        Err(resp) => return resp,
    };
    let handle = match parse_handle(&req.handle) {
        Ok(handle) => handle,
        Err(resp) => return resp,
    };

    let receipt = unwrap_call!(state.service.submit(caller, handle).await);
    Json(SubmitResponse {
        batch_id: receipt.batch_id,
        index: receipt.index,
    })
    .into_response()
}

pub async fn analyze(
    State(state): State<ApiState>,
    Json(req): Json<AnalyzeRequest>,
) -> impl IntoResponse {
    let caller = match parse_address(&req.caller) {
        Ok(addr) => addr,
        Err(resp) => return resp,
    };
    let threshold = match parse_handle(&req.threshold) {
        Ok(handle) => handle,
        Err(resp) => return resp,
    };

    let request_id = unwrap_call!(
        state
            .service
            .request_analysis(caller, req.batch_id, req.index, threshold)
            .await
    );
    Json(AnalyzeResponse { request_id }).into_response()
}

// ============================================================================
// Oracle Callback
// ============================================================================

/// Decryption result delivered over HTTP. The ledger itself enforces the
/// trusted-oracle identity and payload integrity; this handler only
/// decodes.
pub async fn oracle_callback(
    State(state): State<ApiState>,
    Json(req): Json<CallbackRequest>,
) -> impl IntoResponse {
    let caller = match parse_address(&req.caller) {
        Ok(addr) => addr,
        Err(resp) => return resp,
    };
    let cleartext = match parse_hex(&req.cleartext, "cleartext") {
        Ok(bytes) => bytes,
        Err(resp) => return resp,
    };
    let proof = match parse_hex(&req.proof, "proof") {
        Ok(bytes) => bytes,
        Err(resp) => return resp,
    };

    let callback = OracleCallback {
        caller,
        request_id: req.request_id,
        cleartext,
        proof,
    };
    let result = unwrap_call!(state.service.oracle_callback(callback).await);
    Json(CallbackResponse {
        request_id: req.request_id,
        result,
    })
    .into_response()
}

// ============================================================================
// Dev Mode
// ============================================================================

/// Seal a plaintext value with the dev engine so manual testing has
/// something to submit.
pub async fn dev_seal(
    State(state): State<ApiState>,
    Json(req): Json<DevSealRequest>,
) -> impl IntoResponse {
    let Some(engine) = state.dev_engine.as_ref().filter(|_| state.dev_mode) else {
        return (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new("Dev mode disabled", "DEV_DISABLED")),
        )
            .into_response();
    };

    match engine.seal_value(req.value) {
        Ok(handle) => Json(DevSealResponse {
            handle: handle.to_hex(),
        })
        .into_response(),
        Err(err) => {
            error!("dev seal failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal("Seal failed")),
            )
                .into_response()
        }
    }
}
