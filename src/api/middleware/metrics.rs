//! HTTP metrics middleware

use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::infrastructure::observability::record_http_request;

/// Record method, route pattern, status and latency of every request
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let route = route_label(&request);

    let response = next.run(request).await;

    record_http_request(
        method.as_str(),
        &route,
        response.status().as_u16(),
        start.elapsed(),
    );

    response
}

const UNMATCHED_ROUTE: &str = "unmatched";

/// The matched route pattern, or a fixed label so unknown paths add no series
fn route_label(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_label_without_matched_path_is_fixed() {
        let request = Request::builder()
            .uri("/no/such/route/%C3%A9?x=1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(route_label(&request), UNMATCHED_ROUTE);
    }
}
