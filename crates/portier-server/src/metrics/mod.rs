//! Prometheus metrics for Portier
//!
//! Exposes metrics at `/metrics` endpoint in Prometheus format.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use portier_auth::LoginOutcome;
use portier_core::types::SessionState;
use once_cell::sync::OnceCell;
use std::time::Instant;
use tracing::warn;

use crate::server::AppState;

/// Metric names
pub mod names {
    pub const CHECK_TOTAL: &str = "portier_check_total";
    pub const LOGIN_TOTAL: &str = "portier_login_total";
    pub const LOGIN_ERRORS_TOTAL: &str = "portier_login_errors_total";
    pub const LOGOUT_TOTAL: &str = "portier_logout_total";
    pub const UPTIME_SECONDS: &str = "portier_uptime_seconds";
    pub const INFO: &str = "portier_info";
}

/// Metrics recorder
#[derive(Clone)]
pub struct MetricsRecorder {
    handle: PrometheusHandle,
    start_time: Instant,
}

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

impl MetricsRecorder {
    /// Install the Prometheus recorder as the global recorder on first use.
    ///
    /// Every recorder built afterwards shares the installed handle.
    pub fn new() -> Self {
        let handle = HANDLE
            .get_or_init(|| {
                let recorder = PrometheusBuilder::new().build_recorder();
                let handle = recorder.handle();
                if metrics::set_global_recorder(recorder).is_err() {
                    warn!("Another global metrics recorder is installed, /metrics stays empty");
                }
                handle
            })
            .clone();

        gauge!(names::INFO, "version" => portier_core::VERSION).set(1.0);

        Self {
            handle,
            start_time: Instant::now(),
        }
    }

    /// Get metrics output in Prometheus format
    pub fn render(&self) -> String {
        gauge!(names::UPTIME_SECONDS).set(self.start_time.elapsed().as_secs_f64());

        self.handle.render()
    }

    /// Record a `/check` decision
    pub fn record_check(&self, state: SessionState) {
        counter!(names::CHECK_TOTAL, "decision" => state.as_str()).increment(1);
    }

    /// Record a login attempt
    pub fn record_login(&self, outcome: &LoginOutcome) {
        counter!(names::LOGIN_TOTAL, "outcome" => outcome.as_str()).increment(1);
    }

    /// Record a login that failed inside the gateway
    pub fn record_login_error(&self, code: &'static str) {
        counter!(names::LOGIN_ERRORS_TOTAL, "code" => code).increment(1);
    }

    pub fn record_logout(&self) {
        counter!(names::LOGOUT_TOTAL).increment(1);
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Handler for /metrics endpoint
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let output = state.metrics.render();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        output,
    )
}
