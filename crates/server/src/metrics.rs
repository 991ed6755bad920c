//! Prometheus metrics
//!
//! The pipeline records through the `metrics` facade; this module installs
//! the Prometheus recorder and serves its rendering.

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use crate::ServerError;

/// Global Prometheus handle
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder; call once at startup
pub fn init_metrics() -> Result<PrometheusHandle, ServerError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Internal(format!("Failed to install Prometheus recorder: {}", e)))?;

    register_default_metrics();

    METRICS_HANDLE.get_or_init(|| handle.clone());
    Ok(handle)
}

/// Register series up front so they appear before the first call
fn register_default_metrics() {
    for outcome in ["success", "degraded", "aborted"] {
        counter!("callbot_calls_total", "outcome" => outcome).absolute(0);
    }
    for stage in ["enhance", "stt", "sentiment", "reply", "tts"] {
        counter!("callbot_stage_degraded_total", "stage" => stage).absolute(0);
    }
    histogram!("callbot_call_duration_seconds").record(0.0);
}

/// Count a request to an endpoint
pub fn record_request(endpoint: &'static str) {
    counter!("callbot_requests_total", "endpoint" => endpoint).increment(1);
}

/// `GET /metrics`
pub async fn metrics_handler() -> impl IntoResponse {
    match METRICS_HANDLE.get() {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain")],
            "metrics disabled\n".to_string(),
        ),
    }
}
