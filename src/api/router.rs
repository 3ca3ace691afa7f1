use axum::{
    body::Body,
    http::{HeaderName, Request},
    middleware,
    routing::get,
    Router,
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::health;
use super::hospitals;
use super::middleware::{logging_middleware, metrics_middleware};
use super::state::AppState;
use crate::infrastructure::observability::{create_metrics_router, PrometheusMetrics};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Create the full router with application state.
/// The metrics endpoint is merged outside the request middleware.
pub fn create_router(
    state: AppState,
    metrics: Option<PrometheusMetrics>,
    metrics_path: &str,
) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let mut router = Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        // Bulk import API
        .nest("/hospitals", hospitals::create_hospitals_router())
        .with_state(state)
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");

            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id
            )
        }))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid));

    if let Some(m) = metrics {
        router = router.merge(create_metrics_router(m, metrics_path));
    }

    router
}
