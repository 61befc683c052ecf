use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use super::AppState;

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// GET /metrics
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.prometheus_handle.as_ref() {
        Some(handle) => handle.render().into_response(),
        None => (
            StatusCode::NOT_FOUND,
            "Metrics are disabled (observability.metrics_enabled = false)",
        )
            .into_response(),
    }
}

/// Metric label for a request path.
///
/// The layer runs outside routing, so ids are folded here: numeric segments
/// become `{id}` and anything that is not a plain lowercase word becomes
/// `{param}`.
fn route_label(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            if segment.bytes().all(|b| b.is_ascii_digit()) {
                "{id}"
            } else if segment.len() > 32
                || !segment
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b == b'-' || b == b'_')
            {
                "{param}"
            } else {
                segment
            }
        })
        .collect();

    format!("/{}", segments.join("/"))
}

/// Reuses a caller-supplied `x-request-id` when it is short printable ASCII.
fn request_id(req: &Request) -> String {
    req.headers()
        .get(&REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| {
            !v.is_empty() && v.len() <= 64 && v.bytes().all(|b| b.is_ascii_graphic())
        })
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_string)
}

pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = request_id(&req);
    let method = req.method().to_string();
    let route = route_label(req.uri().path());

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        route = %route,
    );

    async move {
        let mut response = next.run(req).await;
        let status = response.status();

        let labels = [
            ("method", method),
            ("route", route),
            ("status", status.as_u16().to_string()),
        ];
        metrics::counter!("rqflow_http_requests_total", &labels).increment(1);
        metrics::histogram!("rqflow_http_request_duration_seconds", &labels)
            .record(start.elapsed().as_secs_f64());

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        if status.is_server_error() {
            warn!(
                event = "http_request_failed",
                duration_ms,
                status_code = status.as_u16(),
                "Request failed"
            );
        } else {
            info!(
                event = "http_request_finished",
                duration_ms,
                status_code = status.as_u16(),
                "Request finished"
            );
        }

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID, value);
        }
        response
    }
    .instrument(span)
    .await
}

pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert("referrer-policy", HeaderValue::from_static("no-referrer"));
    headers.insert("cache-control", HeaderValue::from_static("no-store"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_label_folds_ids() {
        assert_eq!(
            route_label("/api/requisitions/12/status"),
            "/api/requisitions/{id}/status"
        );
        assert_eq!(route_label("/api/users/7"), "/api/users/{id}");
        assert_eq!(route_label("/api/system/health/live"), "/api/system/health/live");
        assert_eq!(route_label("/"), "/");
    }

    #[test]
    fn test_route_label_folds_free_text() {
        assert_eq!(route_label("/api/requisitions/RQ-0001"), "/api/requisitions/{param}");
        assert_eq!(route_label("/api/../etc/passwd"), "/api/{param}/etc/passwd");
        assert_eq!(
            route_label(&format!("/api/{}", "a".repeat(40))),
            "/api/{param}"
        );
    }

    #[test]
    fn test_request_id_reuses_sane_header() {
        let req = Request::builder()
            .uri("/api/system/health/live")
            .header("x-request-id", "abc-123")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(request_id(&req), "abc-123");

        let req = Request::builder()
            .uri("/api/system/health/live")
            .header("x-request-id", "x".repeat(80))
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(request_id(&req).len(), 36);
    }
}
