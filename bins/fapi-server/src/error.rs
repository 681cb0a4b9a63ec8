use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("create upload dir {}: {source}", .path.display())]
    UploadDir { path: PathBuf, source: std::io::Error },

    #[error("bind {addr}: {source}")]
    Bind { addr: String, source: std::io::Error },

    #[error("{0}")]
    Pipeline(#[from] fapi_pipeline::PipelineError),

    #[error("api server: {0}")]
    Serve(#[source] std::io::Error),

    #[error("api server task: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("spawn writer join thread: {0}")]
    Join(#[source] std::io::Error),

    #[error("signal: {0}")]
    Signal(#[source] std::io::Error),
}
