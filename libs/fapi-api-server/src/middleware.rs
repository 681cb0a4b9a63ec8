use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;

use crate::AppState;

/// Сигнал отмены запроса: срабатывает по дедлайну запроса или при
/// shutdown сервера. Кладётся в extensions middleware'ом `with_deadline`.
#[derive(Clone, Debug)]
pub struct RequestCancel(pub CancellationToken);

// ═══════════════════════════════════════════════════════════════
//  Deadline
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn with_deadline(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let token = state.shutdown.child_token();
    req.extensions_mut().insert(RequestCancel(token.clone()));

    let timeout = state.config.request_timeout;
    let _timer = AbortOnDropHandle::new(tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        token.cancel();
    }));

    next.run(req).await
}

// ═══════════════════════════════════════════════════════════════
//  CORS
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn with_cors(req: Request, next: Next) -> Response {
    let mut resp = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };

    let headers = resp.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    resp
}

// ═══════════════════════════════════════════════════════════════
//  Logging
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn with_logging(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let start = Instant::now();

    let resp = next.run(req).await;

    tracing::info!(
        %method,
        %path,
        status = resp.status().as_u16(),
        elapsed = ?start.elapsed(),
        "request"
    );
    resp
}

// ═══════════════════════════════════════════════════════════════
//  Panic recovery
// ═══════════════════════════════════════════════════════════════

/// Паника в обработчике → 500, процесс продолжает обслуживать запросы.
pub(crate) async fn with_recover(req: Request, next: Next) -> Response {
    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(resp) => resp,
        Err(panic) => {
            tracing::error!(panic = %panic_message(panic.as_ref()), "request handler panicked");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error\n").into_response()
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::middleware::from_fn;
    use axum::routing::get;

    async fn boom() -> StatusCode {
        panic!("handler exploded")
    }

    async fn fine() -> &'static str {
        "fine"
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn panic_becomes_500_and_server_keeps_serving() {
        let app = Router::new()
            .route("/boom", get(boom))
            .route("/fine", get(fine))
            .layer(from_fn(with_recover));
        let base = serve(app).await;
        let client = reqwest::Client::new();

        let resp = client.get(format!("{base}/boom")).send().await.unwrap();
        assert_eq!(resp.status(), 500);
        assert_eq!(resp.text().await.unwrap(), "Internal Server Error\n");

        let resp = client.get(format!("{base}/fine")).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.text().await.unwrap(), "fine");
    }

    #[tokio::test]
    async fn cors_headers_and_preflight() {
        let app = Router::new().route("/fine", get(fine)).layer(from_fn(with_cors));
        let base = serve(app).await;
        let client = reqwest::Client::new();

        let resp = client
            .request(reqwest::Method::OPTIONS, format!("{base}/fine"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 204);
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");

        let resp = client.get(format!("{base}/fine")).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers()["access-control-allow-methods"],
            "GET, POST, OPTIONS"
        );
    }

    #[test]
    fn panic_message_handles_both_string_kinds() {
        let a: Box<dyn Any + Send> = Box::new("static");
        let b: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let c: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(a.as_ref()), "static");
        assert_eq!(panic_message(b.as_ref()), "owned");
        assert_eq!(panic_message(c.as_ref()), "non-string panic payload");
    }
}
