//! Health and metrics handlers

use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;
use utoipa::ToSchema;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Liveness probe - basic health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_secs(),
    })
}

/// Readiness response
#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub ready: bool,
}

/// Readiness probe
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 503, description = "Service not ready", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let ready = state.is_ready();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ReadinessResponse { ready }))
}

/// Prometheus text exposition of request metrics
pub async fn prometheus_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let output = render_metrics(&state).await;

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        output,
    )
}

async fn render_metrics(state: &AppState) -> String {
    let mut output = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(output, "# HELP sked_uptime_seconds Time since server start");
    let _ = writeln!(output, "# TYPE sked_uptime_seconds gauge");
    let _ = writeln!(output, "sked_uptime_seconds {}\n", state.uptime_secs());

    let _ = writeln!(output, "# HELP sked_requests_total Total number of HTTP requests");
    let _ = writeln!(output, "# TYPE sked_requests_total counter");
    let _ = writeln!(output, "sked_requests_total {}\n", state.get_request_count());

    let _ = writeln!(output, "# HELP sked_build_info Build information");
    let _ = writeln!(output, "# TYPE sked_build_info gauge");
    let _ = writeln!(
        output,
        "sked_build_info{{version=\"{}\"}} 1\n",
        env!("CARGO_PKG_VERSION")
    );

    let metrics = state.metrics.read().await;
    let mut endpoints: Vec<_> = metrics.iter().collect();
    endpoints.sort_by(|a, b| a.0.cmp(b.0));

    let _ = writeln!(
        output,
        "# HELP sked_http_requests_total HTTP requests by endpoint and status"
    );
    let _ = writeln!(output, "# TYPE sked_http_requests_total counter");
    for (endpoint, endpoint_metrics) in &endpoints {
        for (status, count) in &endpoint_metrics.status_counts {
            let _ = writeln!(
                output,
                "sked_http_requests_total{{endpoint=\"{endpoint}\",status=\"{status}\"}} {count}"
            );
        }
    }
    output.push('\n');

    let _ = writeln!(
        output,
        "# HELP sked_http_request_duration_seconds HTTP request latency"
    );
    let _ = writeln!(output, "# TYPE sked_http_request_duration_seconds histogram");
    for (endpoint, endpoint_metrics) in &endpoints {
        if endpoint_metrics.latency_count == 0 {
            continue;
        }

        let mut cumulative = 0u64;
        for (le, count) in endpoint_metrics.latency_buckets.bounded() {
            cumulative += count;
            let _ = writeln!(
                output,
                "sked_http_request_duration_seconds_bucket{{endpoint=\"{endpoint}\",le=\"{le}\"}} {cumulative}"
            );
        }
        cumulative += endpoint_metrics.latency_buckets.over_1s;
        let _ = writeln!(
            output,
            "sked_http_request_duration_seconds_bucket{{endpoint=\"{endpoint}\",le=\"+Inf\"}} {cumulative}"
        );

        let total_sum_s = endpoint_metrics.total_latency_us as f64 / 1_000_000.0;
        let _ = writeln!(
            output,
            "sked_http_request_duration_seconds_sum{{endpoint=\"{endpoint}\"}} {total_sum_s:.6}"
        );
        let _ = writeln!(
            output,
            "sked_http_request_duration_seconds_count{{endpoint=\"{endpoint}\"}} {}",
            endpoint_metrics.latency_count
        );
    }

    output
}
