use std::{net::SocketAddr, time::Duration};

use axum::{
    extract::ConnectInfo,
    http::{header::USER_AGENT, Request, Response},
};
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    trace::{DefaultOnBodyChunk, DefaultOnEos, DefaultOnRequest, MakeSpan, OnResponse, TraceLayer},
};
use tracing::{error, field::Empty, info, info_span, Span};

use super::request_id::RequestId;

pub type AccessLogLayer = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    AccessLogSpan,
    DefaultOnRequest,
    AccessLogResponse,
    DefaultOnBodyChunk,
    DefaultOnEos,
    (),
>;

/// One `http_request` span per request. Sits inside the request-id layer,
/// so the id is already in the extensions.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLogSpan;

impl<B> MakeSpan<B> for AccessLogSpan {
    fn make_span(&mut self, req: &Request<B>) -> Span {
        let request_id = req
            .extensions()
            .get::<RequestId>()
            .map(|r| r.0.as_str())
            .unwrap_or("-");
        let ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "-".to_string());
        let user_agent = req
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        info_span!(
            "http_request",
            request_id = %request_id,
            method = %req.method(),
            path = %req.uri().path(),
            ip = %ip,
            user_agent = %user_agent,
            status = Empty,
            latency_ms = Empty,
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLogResponse;

impl<B> OnResponse<B> for AccessLogResponse {
    fn on_response(self, res: &Response<B>, latency: Duration, span: &Span) {
        let status = res.status().as_u16();
        let latency_ms = latency.as_millis() as u64;
        span.record("status", status);
        span.record("latency_ms", latency_ms);
        if res.status().is_server_error() {
            error!(status, latency_ms, "response");
        } else {
            info!(status, latency_ms, "response");
        }
    }
}

/// 5xx are reported once, by [`AccessLogResponse`]; the failure hook is off.
pub fn access_log_layer() -> AccessLogLayer {
    TraceLayer::new_for_http()
        .make_span_with(AccessLogSpan)
        .on_response(AccessLogResponse)
        .on_failure(())
}
