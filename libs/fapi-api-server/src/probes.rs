use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::AppState;

// ═══════════════════════════════════════════════════════════════
//  GET /v1/health (liveness)
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, "OK\n")
}

// ═══════════════════════════════════════════════════════════════
//  GET /v1/ready (readiness)
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_ready(State(state): State<AppState>) -> impl IntoResponse {
    if state.readiness.is_ready() {
        (StatusCode::OK, "READY\n")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY\n")
    }
}
