use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::adjudication::advisory::{HeuristicTier, ModelTier, RuleCueTier};
use crate::adjudication::domain::{
    CategoryMetric, Claim, ClaimId, ErrorType, RefinedEntry, TenantConfig, TenantId, Verdict,
};
use crate::adjudication::repository::{
    ClaimStore, DeletionCounts, MetricsStore, RepositoryError, RuleStore, StoredClaim, TenantAdmin,
};
use crate::adjudication::rules::{Condition, Rule, RuleKind};
use crate::adjudication::{
    AdjudicationService, AdvisoryProvider, CallThrottle, CompletionTransport,
    InMemoryTenantStore, TransportError,
};
use crate::config::ValidationConfig;

pub(super) fn tenant() -> TenantId {
    TenantId("clinic-a".to_string())
}

pub(super) fn outpatient_claim(id: &str, service: &str, paid: f64) -> Claim {
    Claim {
        encounter_type: Some("Outpatient".to_string()),
        service_code: Some(service.to_string()),
        paid_amount_aed: Some(paid),
        ..Claim::new(id)
    }
}

pub(super) fn rule(
    rule_id: &str,
    field: &str,
    condition: Condition,
    value: Value,
    error_type: ErrorType,
) -> Rule {
    Rule {
        rule_id: rule_id.to_string(),
        field: field.to_string(),
        condition,
        value,
        error_type,
        explanation: format!("{rule_id} failed on {field}"),
        recommended_action: format!("Correct {field}"),
    }
}

pub(super) fn build_service(
    store: Arc<InMemoryTenantStore>,
) -> Arc<AdjudicationService<InMemoryTenantStore>> {
    Arc::new(AdjudicationService::new(
        store,
        Arc::new(AdvisoryProvider::offline()),
        ValidationConfig { max_concurrency: 4 },
    ))
}

pub(super) fn seeded_store(claims: Vec<Claim>) -> Arc<InMemoryTenantStore> {
    let store = Arc::new(InMemoryTenantStore::new());
    store.upsert_claims(&tenant(), claims).expect("seed claims");
    store
}

/// Canned behavior for the fake model endpoint.
pub(super) enum Script {
    Reply(String),
    RateLimited,
    Fail,
    Hang(Duration),
}

/// Counts attempts and answers from its script.
pub(super) struct ScriptedTransport {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub(super) fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionTransport for ScriptedTransport {
    async fn complete(&self, _prompt: &str) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Reply(text) => Ok(text.clone()),
            Script::RateLimited => Err(TransportError::RateLimited),
            Script::Fail => Err(TransportError::Status(500)),
            Script::Hang(delay) => {
                tokio::time::sleep(*delay).await;
                Ok("[]".to_string())
            }
        }
    }
}

pub(super) fn model_provider(
    transport: Arc<ScriptedTransport>,
    throttle: Arc<CallThrottle>,
    timeout: Duration,
) -> AdvisoryProvider {
    AdvisoryProvider::new(vec![
        Box::new(ModelTier::new(transport, throttle, timeout)),
        Box::new(RuleCueTier),
        Box::new(HeuristicTier),
    ])
}

pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl RuleStore for UnavailableStore {
    fn fetch_rules(&self, _: &TenantId, _: Option<RuleKind>) -> Result<Vec<Rule>, RepositoryError> {
        offline()
    }

    fn save_rules(&self, _: &TenantId, _: RuleKind, _: Vec<Rule>) -> Result<(), RepositoryError> {
        offline()
    }

    fn tenant_config(&self, _: &TenantId, _: &str) -> Result<Option<String>, RepositoryError> {
        offline()
    }

    fn set_tenant_config(&self, _: &TenantId, _: &str, _: &str) -> Result<(), RepositoryError> {
        offline()
    }

    fn list_tenant_config(&self, _: &TenantId) -> Result<TenantConfig, RepositoryError> {
        offline()
    }
}

impl ClaimStore for UnavailableStore {
    fn fetch_claims(&self, _: &TenantId) -> Result<Vec<StoredClaim>, RepositoryError> {
        offline()
    }

    fn upsert_claims(&self, _: &TenantId, _: Vec<Claim>) -> Result<usize, RepositoryError> {
        offline()
    }

    fn update_claim_verdict(
        &self,
        _: &TenantId,
        _: &ClaimId,
        _: &Verdict,
    ) -> Result<(), RepositoryError> {
        offline()
    }
}

impl MetricsStore for UnavailableStore {
    fn save_metrics(&self, _: &TenantId, _: &[CategoryMetric]) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_metrics(&self, _: &TenantId) -> Result<Vec<CategoryMetric>, RepositoryError> {
        offline()
    }

    fn append_refined(&self, _: &TenantId, _: Vec<RefinedEntry>) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_refined(&self, _: &TenantId) -> Result<Vec<RefinedEntry>, RepositoryError> {
        offline()
    }
}

impl TenantAdmin for UnavailableStore {
    fn delete_tenant(&self, _: &TenantId) -> Result<DeletionCounts, RepositoryError> {
        offline()
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
