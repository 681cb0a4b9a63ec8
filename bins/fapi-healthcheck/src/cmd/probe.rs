use std::time::Duration;

use super::config::ProbeArgs;
use super::error::ProbeError;

/// Один GET на probe; успех только при 200. Возвращает опрошенный URL.
pub async fn check(args: &ProbeArgs) -> Result<String, ProbeError> {
    let url = args.url();
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout))
        .build()
        .map_err(ProbeError::Client)?;

    tracing::debug!(%url, "probing");
    let resp = http
        .get(&url)
        .send()
        .await
        .map_err(|source| ProbeError::Request { url: url.clone(), source })?;

    let status = resp.status();
    if status != reqwest::StatusCode::OK {
        return Err(ProbeError::Status {
            check: args.check.as_str(),
            url,
            status,
        });
    }
    Ok(url)
}
