use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Ошибки обработки запроса, видимые клиенту.
///
/// Все варианты отклоняют запрос до постановки в очередь, кроме
/// `Cancelled`/`ShuttingDown`, которые означают проигранную гонку admission.
/// `Inflate`: распаковка gzip упала в blocking пуле.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Failed to read request body")]
    Body(#[source] axum::Error),

    #[error("Invalid gzip data")]
    Gzip(#[source] std::io::Error),

    #[error("Decompressed body exceeds {limit} bytes")]
    InflatedTooLarge { limit: usize },

    #[error("Only GET and POST allowed")]
    MethodNotAllowed,

    #[error("Request cancelled")]
    Cancelled,

    #[error("Server shutting down")]
    ShuttingDown,

    #[error("Internal Server Error")]
    Inflate(#[source] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Body(_) | ApiError::Gzip(_) | ApiError::InflatedTooLarge { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Cancelled => StatusCode::REQUEST_TIMEOUT,
            ApiError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Inflate(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = ?self, "request failed");
        }
        match std::error::Error::source(&self) {
            Some(cause) => {
                tracing::info!(status = status.as_u16(), error = %self, cause = %cause, "request rejected")
            }
            None => tracing::info!(status = status.as_u16(), error = %self, "request rejected"),
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
