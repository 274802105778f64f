use crate::batch::seed_tenant;
use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_adjudication_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rcm_engine::adjudication::{
    AdjudicationService, AdvisoryProvider, InMemoryTenantStore, TenantId,
};
use rcm_engine::config::AppConfig;
use rcm_engine::error::AppError;
use rcm_engine::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryTenantStore::new());
    if let Some(tenant) = args.tenant.take() {
        let tenant = TenantId(tenant);
        let claims = seed_tenant(
            &store,
            &tenant,
            args.claims.as_deref(),
            args.technical_rules.as_deref(),
            args.medical_rules.as_deref(),
            &args.overrides,
        )?;
        info!(tenant = %tenant, claims, "seeded tenant from files");
    }
    let advisory = Arc::new(AdvisoryProvider::from_config(
        &config.advisory,
        config.advisory.throttle(),
    ));
    let tiers = advisory.tier_names();
    let service = Arc::new(AdjudicationService::new(
        store,
        advisory,
        config.validation,
    ));

    let app = with_adjudication_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        ?tiers,
        max_concurrency = config.validation.max_concurrency,
        "claim adjudication service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
