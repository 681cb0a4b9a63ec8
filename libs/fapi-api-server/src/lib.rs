mod decode;
pub mod error;
mod ingest;
mod middleware;
pub mod naming;
mod probes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{any, get};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use fapi_pipeline::{Readiness, WriteQueue};

pub use error::ApiError;
pub use middleware::RequestCancel;

pub const SUBMIT_PATH: &str = "/v1/collection";
pub const HEALTH_PATH: &str = "/v1/health";
pub const READY_PATH: &str = "/v1/ready";

/// Параметры HTTP слоя, фиксируются при старте процесса.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Каталог для принятых payload'ов. Должен существовать.
    pub upload_dir: PathBuf,
    /// Лимит тела запроса в байтах (и сжатого, и распакованного).
    pub max_body_size: usize,
    /// Сколько запрос может ждать места в очереди записи.
    pub request_timeout: Duration,
}

#[derive(Clone)]
pub struct AppState {
    queue: WriteQueue,
    readiness: Readiness,
    config: Arc<ApiConfig>,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        queue: WriteQueue,
        readiness: Readiness,
        config: ApiConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            queue,
            readiness,
            config: Arc::new(config),
            shutdown,
        }
    }
}

/// Маршруты + middleware: recover(logging(cors(deadline(routes)))).
pub fn router(state: AppState) -> Router {
    let submit = get(ingest::handle_alive)
        .post(ingest::handle_submit)
        .fallback(ingest::handle_method_not_allowed);

    Router::new()
        .route(SUBMIT_PATH, submit.clone())
        .route("/v1/collection/", submit)
        // Health/readiness отвечают на любой метод.
        .route(HEALTH_PATH, any(probes::handle_health))
        .route(READY_PATH, any(probes::handle_ready))
        .route("/v1/readiness", any(probes::handle_ready))
        .layer(from_fn_with_state(state.clone(), middleware::with_deadline))
        .layer(from_fn(middleware::with_cors))
        .layer(from_fn(middleware::with_logging))
        .layer(from_fn(middleware::with_recover))
        .with_state(state)
}

/// HTTP сервер на уже привязанном listener'е.
///
/// Возвращается после срабатывания shutdown token'а и завершения
/// текущих запросов. Запросы, ждущие места в очереди, отменяются
/// вместе с token'ом и получают 408.
pub async fn run(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let shutdown = state.shutdown.clone();
    let app = router(state);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown.cancelled_owned())
    .await
}
