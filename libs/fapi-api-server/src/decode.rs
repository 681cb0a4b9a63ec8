use std::io::Read;

use axum::body::Body;
use axum::http::HeaderMap;
use axum::http::header::CONTENT_ENCODING;
use flate2::read::MultiGzDecoder;

use crate::error::ApiError;

/// Прочитать тело запроса целиком, не больше `limit` байт.
///
/// При `Content-Encoding: gzip` тело распаковывается в blocking пуле
/// tokio; распакованный размер ограничен тем же `limit`.
pub(crate) async fn read_payload(headers: &HeaderMap, body: Body, limit: usize) -> Result<Vec<u8>, ApiError> {
    let raw = axum::body::to_bytes(body, limit).await.map_err(ApiError::Body)?;
    if !is_gzip(headers) {
        return Ok(raw.to_vec());
    }
    tokio::task::spawn_blocking(move || gunzip(&raw, limit))
        .await
        .map_err(ApiError::Inflate)?
}

pub(crate) fn is_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("gzip"))
}

pub(crate) fn gunzip(data: &[u8], limit: usize) -> Result<Vec<u8>, ApiError> {
    let mut out = Vec::new();
    MultiGzDecoder::new(data)
        .take(limit as u64 + 1)
        .read_to_end(&mut out)
        .map_err(ApiError::Gzip)?;
    if out.len() > limit {
        return Err(ApiError::InflatedTooLarge { limit });
    }
    Ok(out)
}
