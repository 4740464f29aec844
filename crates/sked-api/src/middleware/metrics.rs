//! Request metrics middleware
//!
//! Records status code and latency per route for the Prometheus text
//! exposition at `/metrics`.

use crate::state::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

/// Label shared by every request that matched no route
pub const UNMATCHED_ENDPOINT: &str = "unmatched";

/// Metrics tracking middleware
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let endpoint = endpoint_label(&request);

    let response = next.run(request).await;

    let latency_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
    state
        .record_request(endpoint, response.status().as_u16(), latency_us)
        .await;

    response
}

/// Route template the request matched, e.g. `/api/activate/:link`
///
/// Raw paths are never used as labels: the set of series stays bounded by
/// the route table no matter what clients request.
fn endpoint_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str)
        .filter(|route| !route.contains("__private__"))
        .unwrap_or(UNMATCHED_ENDPOINT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_unrouted_request_label() {
        let request = Request::builder()
            .uri("/scan-1/wp-login.php")
            .body(Body::empty())
            .unwrap();

        assert_eq!(endpoint_label(&request), UNMATCHED_ENDPOINT);
    }
}
