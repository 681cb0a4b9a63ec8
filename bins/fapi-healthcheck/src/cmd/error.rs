#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("{check} check failed for {url}: status {status}")]
    Status {
        check: &'static str,
        url: String,
        status: reqwest::StatusCode,
    },
}
