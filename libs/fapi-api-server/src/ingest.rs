use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use fapi_pipeline::{Admission, Rejection, WriteJob};

use crate::AppState;
use crate::decode::read_payload;
use crate::error::ApiError;
use crate::middleware::RequestCancel;
use crate::naming::{PayloadKind, client_addr, payload_filename, random_suffix};

// ═══════════════════════════════════════════════════════════════
//  POST /v1/collection
// ═══════════════════════════════════════════════════════════════

/// Принять payload и поставить его запись в очередь.
///
/// Ответ отправляется по факту admission, а не по завершении записи:
/// 202 означает «в очереди», не «на диске».
pub(crate) async fn handle_submit(
    State(state): State<AppState>,
    req: Request,
) -> Result<Response, ApiError> {
    let (parts, body) = req.into_parts();
    let cancel = parts
        .extensions
        .get::<RequestCancel>()
        .map(|c| c.0.clone())
        .unwrap_or_else(|| state.shutdown.child_token());

    let payload = read_payload(&parts.headers, body, state.config.max_body_size).await?;

    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let addr = client_addr(&parts.headers, peer);
    let kind = PayloadKind::classify(&payload);
    let filename = payload_filename(&addr, Utc::now(), random_suffix(), kind);
    let path = state.config.upload_dir.join(&filename);
    let bytes = payload.len();

    match state.queue.admit(WriteJob::new(payload, path), &cancel).await {
        Admission::Admitted => {
            tracing::debug!(%filename, bytes, depth = state.queue.depth(), "payload admitted");
            let message = match kind {
                PayloadKind::Json => "JSON stored\n",
                PayloadKind::Text => "Invalid JSON, stored as .txt\n",
            };
            Ok((StatusCode::ACCEPTED, message).into_response())
        }
        Admission::Rejected(Rejection::Cancelled) => {
            tracing::warn!(%filename, capacity = state.queue.capacity(), "admission cancelled, queue saturated");
            Err(ApiError::Cancelled)
        }
        Admission::Rejected(Rejection::Closed) => Err(ApiError::ShuttingDown),
    }
}

// ═══════════════════════════════════════════════════════════════
//  GET /v1/collection
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_alive() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "API is alive" }))
}

pub(crate) async fn handle_method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
