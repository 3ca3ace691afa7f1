//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::MetricsConfig;
use crate::domain::batch::EntryStatus;

static UUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("valid uuid regex")
});

static NUMERIC_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\d+(/|$)").expect("valid numeric segment regex"));

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// A handle backed by a recorder that is not installed globally
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self {
            handle: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        }
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("hospital_import_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!("Prometheus metrics initialized at {}", config.path);

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// Record the outcome of one imported row
pub fn record_row_outcome(status: &EntryStatus) {
    counter!("hospital_import_rows_total", "outcome" => outcome_label(status)).increment(1);
}

/// Record a finished batch pass
pub fn record_batch_completed(activated: bool, duration: Duration) {
    let activated = if activated { "true" } else { "false" };

    counter!("hospital_import_batches_total", "activated" => activated).increment(1);
    histogram!("hospital_import_batch_duration_seconds").record(duration.as_secs_f64());
}

fn outcome_label(status: &EntryStatus) -> &'static str {
    match status {
        EntryStatus::Created | EntryStatus::CreatedAndActivated => "created",
        EntryStatus::InvalidRow => "invalid",
        EntryStatus::CreateFailed => "rejected",
        EntryStatus::RequestError(_) => "request_error",
    }
}

const MAX_PATH_LABEL_CHARS: usize = 50;

/// Sanitize URL path for metric labels (remove IDs, limit cardinality)
fn sanitize_path(path: &str) -> String {
    let path = UUID_PATTERN.replace_all(path, "{id}");
    let path = NUMERIC_SEGMENT.replace_all(&path, "/{id}$1");

    path.chars().take(MAX_PATH_LABEL_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path_uuid() {
        let path = "/hospitals/batch/550e8400-e29b-41d4-a716-446655440000/status";
        assert_eq!(sanitize_path(path), "/hospitals/batch/{id}/status");
    }

    #[test]
    fn test_sanitize_path_numeric_id() {
        assert_eq!(sanitize_path("/hospitals/123/x"), "/hospitals/{id}/x");
    }

    #[test]
    fn test_sanitize_path_no_id() {
        assert_eq!(sanitize_path("/health"), "/health");
    }

    #[test]
    fn test_sanitize_path_truncates_long_paths() {
        let path = "/very/long/path/that/exceeds/the/maximum/allowed/length/for/metrics";
        assert!(sanitize_path(path).len() <= 50);
    }

    #[test]
    fn test_sanitize_path_truncates_on_char_boundary() {
        let path = format!("/{}\u{e9}tablissement", "a".repeat(48));
        let sanitized = sanitize_path(&path);

        assert_eq!(sanitized.chars().count(), 50);
        assert!(sanitized.ends_with('\u{e9}'));
    }

    #[test]
    fn test_record_http_request_with_multibyte_path() {
        let path = format!("/{}\u{e9}", "a".repeat(48));
        record_http_request("GET", &path, 404, Duration::from_millis(1));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome_label(&EntryStatus::CreatedAndActivated), "created");
        assert_eq!(outcome_label(&EntryStatus::InvalidRow), "invalid");
        assert_eq!(outcome_label(&EntryStatus::CreateFailed), "rejected");
        assert_eq!(
            outcome_label(&EntryStatus::RequestError("timeout".into())),
            "request_error"
        );
    }
}
