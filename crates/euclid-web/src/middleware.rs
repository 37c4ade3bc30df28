//! Request metrics: count, latency and in-flight requests per route.

use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use euclid_common::metrics::MetricsRegistry;

pub async fn track_metrics(State(metrics): State<MetricsRegistry>, req: Request, next: Next) -> Response {
    // route template, not the concrete path, to keep label cardinality bounded
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = req.method().to_string();

    let _active = metrics.track_active();
    let started = Instant::now();
    let response = next.run(req).await;
    metrics.record_request(&method, &endpoint, response.status().as_u16(), started.elapsed());
    response
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::{middleware, Router};
    use euclid_common::metrics::ACTIVE_REQUESTS;
    use tower::ServiceExt;

    use super::*;

    fn active(metrics: &MetricsRegistry) -> f64 {
        let text = metrics.render_prometheus();
        let line = text.lines().find(|l| l.starts_with(ACTIVE_REQUESTS)).unwrap();
        line.rsplit(' ').next().unwrap().parse().unwrap()
    }

    fn app(metrics: &MetricsRegistry) -> Router {
        Router::new()
            .route("/fast", get(|| async { "ok" }))
            .route("/stuck", get(|| std::future::pending::<&'static str>()))
            .route_layer(middleware::from_fn_with_state(metrics.clone(), track_metrics))
    }

    #[tokio::test]
    async fn test_finished_request_is_counted() {
        let metrics = MetricsRegistry::new();
        let req = Request::builder().uri("/fast").body(Body::empty()).unwrap();
        app(&metrics).oneshot(req).await.unwrap();

        let text = metrics.render_prometheus();
        assert!(text.contains("endpoint=\"/fast\""));
        assert_eq!(active(&metrics), 0.0);
    }

    #[tokio::test]
    async fn test_cancelled_request_releases_active_gauge() {
        let metrics = MetricsRegistry::new();
        let req = Request::builder().uri("/stuck").body(Body::empty()).unwrap();
        let call = app(&metrics).oneshot(req);

        let outcome = tokio::time::timeout(Duration::from_millis(50), call).await;
        assert!(outcome.is_err());
        assert_eq!(active(&metrics), 0.0);
    }
}
