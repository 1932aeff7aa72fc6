use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::Duration;

use axum::body::Body;
use http::{HeaderMap, HeaderValue, StatusCode};
use tower_governor::GovernorError;

/// Error handler for the governor layer.
///
/// Keeps the `{"error": {"code", "message"}}` envelope used by `AppError`.
pub fn rate_limited_response(error: GovernorError) -> http::Response<Body> {
    match error {
        GovernorError::TooManyRequests { wait_time, headers } => {
            let mut resp = json_error(
                StatusCode::TOO_MANY_REQUESTS,
                serde_json::json!({
                    "error": {
                        "code": "RATE_LIMITED",
                        "message": "Rate limit exceeded",
                        "details": { "retry_after_seconds": wait_time }
                    }
                }),
            );
            append_headers(&mut resp, headers);
            resp.headers_mut()
                .insert(http::header::RETRY_AFTER, HeaderValue::from(wait_time));
            resp
        }
        GovernorError::UnableToExtractKey => json_error(
            StatusCode::BAD_REQUEST,
            serde_json::json!({
                "error": {
                    "code": "INVALID_REQUEST",
                    "message": "Unable to determine client IP for rate limiting"
                }
            }),
        ),
        GovernorError::Other { code, msg, headers } => {
            let status =
                StatusCode::from_u16(code.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let mut resp = json_error(
                status,
                serde_json::json!({
                    "error": {
                        "code": "RATE_LIMIT_ERROR",
                        "message": msg.unwrap_or_else(|| "Rate limiting error".to_string())
                    }
                }),
            );
            append_headers(&mut resp, headers);
            resp
        }
    }
}

fn json_error(status: StatusCode, body: serde_json::Value) -> http::Response<Body> {
    let mut resp = http::Response::new(Body::from(body.to_string()));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    resp
}

fn append_headers(resp: &mut http::Response<Body>, headers: Option<HeaderMap>) {
    if let Some(hmap) = headers {
        for (name, value) in hmap.iter() {
            resp.headers_mut().append(name.clone(), value.clone());
        }
    }
}

/// Periodically evict stale limiter keys on a std thread.
///
/// `sweep` runs once a minute and returns the remaining key count. The thread
/// polls `shutdown` every second so it exits promptly.
pub fn spawn_cleanup<F>(label: &'static str, shutdown: Arc<AtomicBool>, sweep: F) -> JoinHandle<()>
where
    F: Fn() -> usize + Send + 'static,
{
    std::thread::spawn(move || {
        let interval = Duration::from_secs(60);
        let tick = Duration::from_secs(1);
        loop {
            for _ in 0..interval.as_secs() {
                if shutdown.load(Ordering::SeqCst) {
                    tracing::info!("{} rate limiter cleanup thread exiting", label);
                    return;
                }
                std::thread::sleep(tick);
            }
            let remaining = sweep();
            tracing::debug!("{} rate limiter size: {}", label, remaining);
        }
    })
}
