//! Request logging middleware configuration

use http::{Request, Response};
use std::time::Duration;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnRequest, MakeSpan, OnResponse, TraceLayer};
use tracing::{info_span, Span};

/// Request span without the query string; `/auth/callback` carries the
/// authorization code there.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        info_span!(
            "http_request",
            method = %request.method(),
            path = %request.uri().path(),
            version = ?request.version(),
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseLogger;

impl<B> OnResponse<B> for ResponseLogger {
    fn on_response(self, response: &Response<B>, latency: Duration, _span: &Span) {
        let status = response.status();
        let latency_ms = latency.as_millis();

        if status.is_server_error() {
            tracing::error!(
                status = status.as_u16(),
                latency_ms = latency_ms,
                "server error response"
            );
        } else if status.is_client_error() {
            tracing::warn!(
                status = status.as_u16(),
                latency_ms = latency_ms,
                "client error response"
            );
        } else {
            tracing::info!(
                status = status.as_u16(),
                latency_ms = latency_ms,
                "request completed"
            );
        }
    }
}

pub fn logging_layer() -> TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    RequestSpan,
    DefaultOnRequest,
    ResponseLogger,
> {
    TraceLayer::new_for_http()
        .make_span_with(RequestSpan)
        .on_response(ResponseLogger)
}
