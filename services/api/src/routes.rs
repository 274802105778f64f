use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use rcm_engine::adjudication::{adjudication_router, AdjudicationService, TenantStore};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_adjudication_routes<S>(service: Arc<AdjudicationService<S>>) -> axum::Router
where
    S: TenantStore + 'static,
{
    adjudication_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use rcm_engine::adjudication::{AdvisoryProvider, InMemoryTenantStore};
    use rcm_engine::config::ValidationConfig;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn app(ready: bool) -> (axum::Router, Arc<AtomicBool>) {
        let readiness = Arc::new(AtomicBool::new(ready));
        let state = AppState {
            readiness: readiness.clone(),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        let service = Arc::new(AdjudicationService::new(
            Arc::new(InMemoryTenantStore::new()),
            Arc::new(AdvisoryProvider::offline()),
            ValidationConfig::default(),
        ));
        (
            with_adjudication_routes(service).layer(Extension(state)),
            readiness,
        )
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn readiness_follows_flag() {
        let (router, readiness) = app(false);
        let response = router
            .clone()
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .expect("ready route");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        readiness.store(true, Ordering::Release);
        let response = router
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .expect("ready route");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn adjudication_routes_are_mounted() {
        let (router, _) = app(true);
        let response = router
            .oneshot(
                Request::post("/api/v1/tenants/unknown/validate")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("validate route");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
