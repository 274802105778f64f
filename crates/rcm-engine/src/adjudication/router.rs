use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};

use super::domain::{CategoryMetric, ErrorCategory, TenantId};
use super::service::{AdjudicationService, TenantStore};
use crate::error::AppError;

/// Router builder exposing validation, reporting and tenant settings.
pub fn adjudication_router<S>(service: Arc<AdjudicationService<S>>) -> Router
where
    S: TenantStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/tenants/:tenant_id/validate",
            post(validate_handler::<S>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/results",
            get(results_handler::<S>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/metrics",
            get(metrics_handler::<S>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/refined",
            get(refined_handler::<S>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/settings",
            get(settings_handler::<S>).post(update_settings_handler::<S>),
        )
        .route("/api/v1/tenants/:tenant_id", delete(delete_handler::<S>))
        .with_state(service)
}

/// Metric row as rendered over HTTP.
#[derive(Debug, Serialize)]
struct MetricView {
    category: ErrorCategory,
    count: u64,
    amount: f64,
}

fn metric_views(metrics: &[CategoryMetric]) -> Vec<MetricView> {
    metrics
        .iter()
        .map(|metric| MetricView {
            category: metric.category,
            count: metric.count,
            amount: metric.total_paid,
        })
        .collect()
}

pub(crate) async fn validate_handler<S>(
    State(service): State<Arc<AdjudicationService<S>>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Value>, AppError>
where
    S: TenantStore + 'static,
{
    let tenant = TenantId(tenant_id);
    let report = service.validate_tenant(&tenant).await?;
    Ok(Json(json!({
        "tenant_id": tenant.0,
        "processed": report.processed,
        "claims": report.verdicts,
        "metrics": metric_views(&report.metrics),
    })))
}

pub(crate) async fn results_handler<S>(
    State(service): State<Arc<AdjudicationService<S>>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Value>, AppError>
where
    S: TenantStore + 'static,
{
    let claims = service.results(&TenantId(tenant_id))?;
    Ok(Json(json!({ "claims": claims })))
}

pub(crate) async fn metrics_handler<S>(
    State(service): State<Arc<AdjudicationService<S>>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Value>, AppError>
where
    S: TenantStore + 'static,
{
    let metrics = service.metrics(&TenantId(tenant_id))?;
    Ok(Json(json!({ "metrics": metric_views(&metrics) })))
}

pub(crate) async fn refined_handler<S>(
    State(service): State<Arc<AdjudicationService<S>>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Value>, AppError>
where
    S: TenantStore + 'static,
{
    let refined = service.refined(&TenantId(tenant_id))?;
    Ok(Json(json!({ "refined": refined })))
}

pub(crate) async fn settings_handler<S>(
    State(service): State<Arc<AdjudicationService<S>>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Value>, AppError>
where
    S: TenantStore + 'static,
{
    let tenant = TenantId(tenant_id);
    let config = service.settings(&tenant)?;
    Ok(Json(json!({ "tenant_id": tenant.0, "config": config })))
}

/// Accepts a flat JSON object. String values are stored as-is; anything else
/// is stored as its JSON text so structured overrides such as caps survive.
pub(crate) async fn update_settings_handler<S>(
    State(service): State<Arc<AdjudicationService<S>>>,
    Path(tenant_id): Path<String>,
    Json(payload): Json<BTreeMap<String, Value>>,
) -> Result<Json<Value>, AppError>
where
    S: TenantStore + 'static,
{
    let values = payload
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect();

    let tenant = TenantId(tenant_id);
    let config = service.update_settings(&tenant, values)?;
    Ok(Json(
        json!({ "status": "ok", "tenant_id": tenant.0, "config": config }),
    ))
}

pub(crate) async fn delete_handler<S>(
    State(service): State<Arc<AdjudicationService<S>>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Value>, AppError>
where
    S: TenantStore + 'static,
{
    let counts = service.delete_tenant(&TenantId(tenant_id))?;
    Ok(Json(json!({ "status": "ok", "deleted": counts })))
}
