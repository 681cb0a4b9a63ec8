use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use fapi_api_server::AppState;
use fapi_pipeline::{BufferPool, Readiness, WriterPool, write_queue};

use crate::config::{ServeArgs, ServerConfig};
use crate::error::ServerError;

pub async fn run(args: ServeArgs) -> Result<(), ServerError> {
    tracing::info!("fapi-server starting");

    // --- Load config ---
    let config = ServerConfig::resolve(&args)?;
    tracing::info!(
        config = %args.config,
        listen = %config.listen,
        upload_dir = %config.upload_dir.display(),
        workers = config.workers,
        queue_capacity = config.queue_capacity,
        max_body_size = config.max_body_size,
        "loaded config"
    );

    // --- CancellationToken for graceful shutdown ---
    let token = CancellationToken::new();

    let mut server = start(&config, token.clone()).await?;

    // --- Ожидание сигнала или падения API сервера ---
    let failure = tokio::select! {
        res = shutdown_signal() => {
            tracing::info!("shutting down...");
            res.err().map(ServerError::Signal)
        }
        res = &mut server.api => {
            tracing::error!("api server stopped unexpectedly");
            match res {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(ServerError::Serve(e)),
                Err(e) => Some(ServerError::Task(e)),
            }
        }
    };

    // Очередь дописывается и при аварийном выходе.
    server.stop(config.shutdown_grace()).await?;
    failure.map_or(Ok(()), Err)
}

// ═══════════════════════════════════════════════════════════════
//  Startup
// ═══════════════════════════════════════════════════════════════

/// Запущенный сервер: API task + writer pool.
pub(crate) struct Running {
    pub(crate) addr: SocketAddr,
    pub(crate) readiness: Readiness,
    api: JoinHandle<std::io::Result<()>>,
    writers: WriterPool,
    token: CancellationToken,
}

/// Стартовая последовательность: upload dir → writer pool → bind →
/// ready. Любая ошибка прерывает старт до выставления readiness.
pub(crate) async fn start(config: &ServerConfig, token: CancellationToken) -> Result<Running, ServerError> {
    let readiness = Readiness::new();

    // --- Upload directory ---
    std::fs::create_dir_all(&config.upload_dir).map_err(|source| ServerError::UploadDir {
        path: config.upload_dir.clone(),
        source,
    })?;
    tracing::info!(path = %config.upload_dir.display(), "upload dir ready");

    // --- Write queue + writer pool ---
    let (queue, receiver) = write_queue(config.queue_capacity)?;
    let buffers = Arc::new(BufferPool::write_buffers(config.workers, config.write_buffer_size));
    let writers = WriterPool::spawn(receiver, config.workers, buffers)?;

    // --- Listener ---
    let listener = TcpListener::bind(&config.listen)
        .await
        .map_err(|source| ServerError::Bind { addr: config.listen.clone(), source })?;
    let addr = listener
        .local_addr()
        .map_err(|source| ServerError::Bind { addr: config.listen.clone(), source })?;

    // --- API server (HTTP) ---
    let state = AppState::new(queue, readiness.clone(), config.api_config(), token.clone());
    let api = tokio::spawn(fapi_api_server::run(listener, state));

    tracing::info!(%addr, writers = writers.workers(), "api server (http) listening");
    readiness.set_ready(true);
    tracing::info!("server ready");

    Ok(Running {
        addr,
        readiness,
        api,
        writers,
        token,
    })
}

impl Running {
    /// Остановить приём запросов и дождаться, пока writer'ы допишут очередь.
    ///
    /// Writer'ы, не успевшие за `grace`, не ждём: join идёт в отдельном
    /// потоке и не держит runtime, так что процесс завершается.
    pub(crate) async fn stop(mut self, grace: Duration) -> Result<(), ServerError> {
        // Signal the HTTP server to stop accepting
        self.token.cancel();

        if !self.api.is_finished() {
            match tokio::time::timeout(grace, &mut self.api).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => tracing::error!(error = %e, "api server error"),
                Ok(Err(e)) => tracing::error!(error = %e, "api server task failed"),
                Err(_) => {
                    tracing::warn!("api server did not stop in time, aborting");
                    self.api.abort();
                }
            }
        }

        // Очередь закрыта вместе с AppState → writer'ы вычерпывают остаток и выходят.
        let stats = self.writers.stats();
        let writers = self.writers;
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        std::thread::Builder::new()
            .name("fapi-writer-join".into())
            .spawn(move || {
                let _ = done_tx.send(writers.join());
            })
            .map_err(ServerError::Join)?;

        match tokio::time::timeout(grace, done_rx).await {
            Ok(_) => tracing::info!("shutdown complete"),
            Err(_) => tracing::warn!(
                written = stats.written(),
                failed = stats.failed(),
                "writers still busy after grace period, exiting without them"
            ),
        }
        Ok(())
    }
}

/// Ctrl+C или SIGTERM (docker stop).
#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = term.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
