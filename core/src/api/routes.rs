//! API Routes
//!
//! Router configuration for the HTTP API.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use super::handlers::{self, ApiState};

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    let mut router = Router::new()
        // Health & Status
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/events", get(handlers::events))
        // Administration (owner-gated in the ledger)
        .route("/admin/transfer_ownership", post(handlers::transfer_ownership))
        .route("/admin/provider/add", post(handlers::add_provider))
        .route("/admin/provider/remove", post(handlers::remove_provider))
        .route("/admin/pause", post(handlers::set_paused))
        .route("/admin/cooldown", post(handlers::set_cooldown))
        // Batch lifecycle
        .route("/batch/open", post(handlers::open_batch))
        .route("/batch/close", post(handlers::close_batch))
        .route("/batch/{batch_id}", get(handlers::get_batch))
        // Submission & analysis
        .route("/submit", post(handlers::submit))
        .route("/analyze", post(handlers::analyze))
        .route("/request/{request_id}", get(handlers::get_request))
        // Oracle callback
        .route("/oracle/callback", post(handlers::oracle_callback));

    // Dev mode endpoints (always registered, but handlers check dev_mode flag)
    // This allows consistent routing while the handlers gate access
    if state.dev_mode {
        router = router.route("/dev/seal", post(handlers::dev_seal));
    }

    router
        // CORS
        .layer(CorsLayer::permissive())
        .with_state(state)
}
