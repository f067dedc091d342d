//! Request/response logging hooks for `TraceLayer`.

use axum::extract::MatchedPath;
use axum::http::{HeaderMap, Request, Response};
use std::collections::HashMap;
use std::time::Duration;
use tower_http::classify::ServerErrorsFailureClass;
use tracing::{info_span, Level, Span};

const SENSITIVE_MARKERS: &[&str] = &["authorization", "cookie", "token"];

fn loggable_headers(headers: &HeaderMap, redact: bool) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let lowered = name.as_str().to_lowercase();
            if redact && SENSITIVE_MARKERS.iter().any(|m| lowered.contains(m)) {
                Some((name.to_string(), "[REDACTED]".to_string()))
            } else {
                value.to_str().ok().map(|v| (name.to_string(), v.to_string()))
            }
        })
        .collect()
}

pub fn make_custom_span<B>(request: &Request<B>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri().path(),
        route = %route,
        query = ?request.uri().query(),
        request_id = request_id,
        user_agent = ?request.headers().get("user-agent"),
    )
}

pub fn on_custom_request<B>(request: &Request<B>, _span: &Span) {
    tracing::debug!(
        method = %request.method(),
        uri = %request.uri(),
        headers = ?loggable_headers(request.headers(), true),
        "Incoming HTTP request"
    );
}

pub fn on_custom_response<B>(response: &Response<B>, latency: Duration, _span: &Span) {
    let status = response.status();
    let latency_ms = latency.as_millis();

    let level = match status.as_u16() {
        400..=499 => Level::WARN,
        500..=599 => Level::ERROR,
        _ => Level::INFO,
    };

    if level == Level::ERROR {
        tracing::error!(
            status = %status,
            latency_ms = latency_ms,
            headers = ?loggable_headers(response.headers(), true),
            "HTTP request completed with server error"
        );
    } else if level == Level::WARN {
        tracing::warn!(status = %status, latency_ms = latency_ms, "HTTP request completed with client error");
    } else {
        tracing::info!(status = %status, latency_ms = latency_ms, "HTTP request completed");
    }
}

pub fn on_custom_failure(error: ServerErrorsFailureClass, latency: Duration, _span: &Span) {
    let error_type = match &error {
        ServerErrorsFailureClass::StatusCode(code) => format!("HTTP {}", code.as_u16()),
        ServerErrorsFailureClass::Error(_) => "Internal Error".to_string(),
    };

    tracing::error!(
        error = ?error,
        latency_ms = latency.as_millis(),
        error_type = error_type,
        "HTTP request failed"
    );
}
