use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid {field}: {detail}")]
    InvalidConfig { field: &'static str, detail: String },

    #[error("spawn writer {index}: {source}")]
    Spawn { index: usize, source: std::io::Error },

    #[error("{stage} {}: {source}", .path.display())]
    Write {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn write(stage: &'static str, path: &std::path::Path, source: std::io::Error) -> Self {
        PipelineError::Write {
            stage,
            path: path.to_path_buf(),
            source,
        }
    }
}
