use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use super::advisory::{AdvisoryContext, AdvisoryProvider};
use super::aggregate::{CategoryTally, ResultAggregator};
use super::domain::{
    CategoryMetric, Claim, ClaimId, ErrorCategory, RefinedEntry, TenantConfig, TenantId, Verdict,
    Violation,
};
use super::domain_rules::DomainRuleEvaluator;
use super::repository::{
    ClaimStore, DeletionCounts, MetricsStore, RepositoryError, RuleStore, StoredClaim, TenantAdmin,
};
use super::rules::{RuleKind, StaticRuleEvaluator};
use crate::config::ValidationConfig;

pub const EVALUATION_FAILED_EXPLANATION: &str = "Claim evaluation failed";
pub const EVALUATION_FAILED_ACTION: &str = "Review claim data and re-run validation";

/// Every collection the service touches for a tenant.
pub trait TenantStore: RuleStore + ClaimStore + MetricsStore + TenantAdmin {}

impl<T> TenantStore for T where T: RuleStore + ClaimStore + MetricsStore + TenantAdmin {}

/// Service running the adjudication pipeline over a tenant's stored claims.
pub struct AdjudicationService<S> {
    store: Arc<S>,
    advisory: Arc<AdvisoryProvider>,
    config: ValidationConfig,
}

/// Evaluators shared read-only by every worker of one run.
struct Pipeline {
    static_rules: StaticRuleEvaluator,
    domain_rules: DomainRuleEvaluator,
    context: AdvisoryContext,
    advisory: Arc<AdvisoryProvider>,
}

impl Pipeline {
    /// Each stage is contained on its own. A stage that panics contributes the
    /// evaluation-failed violation and the findings of the other stages are kept.
    async fn adjudicate(self: Arc<Self>, claim: Arc<Claim>) -> Verdict {
        let stages = [
            contain(&claim, "static_rules", || self.static_rules.evaluate(&claim)),
            contain(&claim, "domain_rules", || self.domain_rules.evaluate(&claim)),
        ];
        let mut violations = Vec::new();
        let mut failed = false;
        for outcome in stages {
            match outcome {
                Some(found) => violations.extend(found),
                None => failed = true,
            }
        }

        let pipeline = Arc::clone(&self);
        let advised = Arc::clone(&claim);
        let advisory = tokio::spawn(async move {
            pipeline.advisory.advise(&advised, &pipeline.context).await
        });
        match advisory.await {
            Ok(found) => violations.extend(found),
            Err(err) => {
                error!(
                    claim_id = %claim.claim_id,
                    stage = "advisory",
                    %err,
                    "claim evaluation stage failed"
                );
                failed = true;
            }
        }

        if failed {
            violations.push(Violation::technical(
                EVALUATION_FAILED_EXPLANATION,
                EVALUATION_FAILED_ACTION,
            ));
        }
        ResultAggregator::verdict(violations, claim.paid_amount_aed)
    }
}

fn contain(
    claim: &Claim,
    stage: &'static str,
    evaluate: impl FnOnce() -> Vec<Violation>,
) -> Option<Vec<Violation>> {
    match panic::catch_unwind(AssertUnwindSafe(evaluate)) {
        Ok(found) => Some(found),
        Err(_) => {
            error!(claim_id = %claim.claim_id, stage, "claim evaluation stage panicked");
            None
        }
    }
}

impl<S> AdjudicationService<S>
where
    S: TenantStore + 'static,
{
    pub fn new(store: Arc<S>, advisory: Arc<AdvisoryProvider>, config: ValidationConfig) -> Self {
        Self {
            store,
            advisory,
            config,
        }
    }

    /// Adjudicate every stored claim for the tenant, persist the verdicts and
    /// replace the tenant's metrics.
    pub async fn validate_tenant(
        &self,
        tenant: &TenantId,
    ) -> Result<ValidationReport, AdjudicationError> {
        let claims: Vec<Claim> = self
            .store
            .fetch_claims(tenant)?
            .into_iter()
            .map(|stored| stored.claim)
            .collect();
        if claims.is_empty() {
            return Err(AdjudicationError::NoClaims(tenant.clone()));
        }

        let technical = self.store.fetch_rules(tenant, Some(RuleKind::Technical))?;
        let medical = self.store.fetch_rules(tenant, Some(RuleKind::Medical))?;
        let tenant_config = self.store.list_tenant_config(tenant)?;

        info!(
            tenant = %tenant,
            claims = claims.len(),
            technical_rules = technical.len(),
            medical_rules = medical.len(),
            "validating tenant claims"
        );

        let pipeline = Arc::new(Pipeline {
            static_rules: StaticRuleEvaluator::new(
                technical.iter().chain(medical.iter()).cloned().collect(),
            ),
            domain_rules: DomainRuleEvaluator::new(tenant_config),
            context: AdvisoryContext {
                technical_rules: technical,
                medical_rules: medical,
            },
            advisory: Arc::clone(&self.advisory),
        });

        let verdicts = self.run_workers(&pipeline, &claims).await;

        let processed_at = Utc::now();
        let mut tally = CategoryTally::default();
        let mut refined = Vec::with_capacity(claims.len());
        let mut outcomes = Vec::with_capacity(claims.len());

        for (claim, verdict) in claims.iter().zip(verdicts) {
            tally.record(verdict.error_type, claim.paid_amount_aed);
            self.store
                .update_claim_verdict(tenant, &claim.claim_id, &verdict)?;
            refined.push(RefinedEntry {
                claim_id: claim.claim_id.clone(),
                verdict: verdict.clone(),
                processed_at,
            });
            outcomes.push(ClaimVerdict {
                claim_id: claim.claim_id.clone(),
                verdict,
            });
        }

        let metrics = tally.into_metrics();
        self.store.append_refined(tenant, refined)?;
        self.store.save_metrics(tenant, &metrics)?;

        let flagged = outcomes
            .iter()
            .filter(|outcome| outcome.verdict.error_type != ErrorCategory::NoError)
            .count();
        info!(tenant = %tenant, processed = outcomes.len(), flagged, "tenant validation complete");

        Ok(ValidationReport {
            processed: outcomes.len(),
            verdicts: outcomes,
            metrics,
        })
    }

    /// One task per claim, bounded by the concurrency limit. Handles are
    /// awaited in claim order so the reduction stays single-writer.
    async fn run_workers(&self, pipeline: &Arc<Pipeline>, claims: &[Claim]) -> Vec<Verdict> {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));

        let handles: Vec<_> = claims
            .iter()
            .map(|claim| {
                let pipeline = Arc::clone(pipeline);
                let permits = Arc::clone(&permits);
                let claim = Arc::new(claim.clone());
                tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await.ok();
                    pipeline.adjudicate(claim).await
                })
            })
            .collect();

        let mut verdicts = Vec::with_capacity(handles.len());
        for (claim, handle) in claims.iter().zip(handles) {
            let verdict = match handle.await {
                Ok(verdict) => verdict,
                Err(err) => {
                    error!(claim_id = %claim.claim_id, %err, "claim evaluation aborted");
                    ResultAggregator::verdict(
                        vec![Violation::technical(
                            EVALUATION_FAILED_EXPLANATION,
                            EVALUATION_FAILED_ACTION,
                        )],
                        claim.paid_amount_aed,
                    )
                }
            };
            verdicts.push(verdict);
        }
        verdicts
    }

    /// Stored claims with their last verdict, in store order.
    pub fn results(&self, tenant: &TenantId) -> Result<Vec<ClaimResultView>, AdjudicationError> {
        let claims = self.store.fetch_claims(tenant)?;
        Ok(claims.iter().map(ClaimResultView::from).collect())
    }

    pub fn metrics(&self, tenant: &TenantId) -> Result<Vec<CategoryMetric>, AdjudicationError> {
        Ok(self.store.fetch_metrics(tenant)?)
    }

    pub fn refined(&self, tenant: &TenantId) -> Result<Vec<RefinedEntry>, AdjudicationError> {
        Ok(self.store.fetch_refined(tenant)?)
    }

    pub fn settings(&self, tenant: &TenantId) -> Result<TenantConfig, AdjudicationError> {
        Ok(self.store.list_tenant_config(tenant)?)
    }

    /// Write each key; later values for the same key overwrite earlier ones.
    pub fn update_settings(
        &self,
        tenant: &TenantId,
        values: BTreeMap<String, String>,
    ) -> Result<TenantConfig, AdjudicationError> {
        for (key, value) in &values {
            self.store.set_tenant_config(tenant, key, value)?;
        }
        Ok(self.store.list_tenant_config(tenant)?)
    }

    pub fn delete_tenant(&self, tenant: &TenantId) -> Result<DeletionCounts, AdjudicationError> {
        let counts = self.store.delete_tenant(tenant)?;
        if counts == DeletionCounts::default() {
            warn!(tenant = %tenant, "delete requested for tenant with no data");
        } else {
            info!(tenant = %tenant, claims = counts.claims, rules = counts.rules, "tenant data deleted");
        }
        Ok(counts)
    }
}

/// Verdict for one claim, in the order the claims were stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimVerdict {
    pub claim_id: ClaimId,
    #[serde(flatten)]
    pub verdict: Verdict,
}

/// Summary of one validation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub processed: usize,
    pub verdicts: Vec<ClaimVerdict>,
    pub metrics: Vec<CategoryMetric>,
}

/// Result row with display defaults filled in for unprocessed claims.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimResultView {
    pub claim_id: ClaimId,
    pub status: String,
    pub error_type: String,
    pub error_explanation: String,
    pub recommended_action: String,
}

impl From<&StoredClaim> for ClaimResultView {
    fn from(stored: &StoredClaim) -> Self {
        let verdict = stored.verdict.as_ref();
        let explanation = verdict
            .map(|verdict| verdict.explanation.as_str())
            .filter(|text| !text.is_empty())
            .unwrap_or("No issues");

        Self {
            claim_id: stored.claim.claim_id.clone(),
            status: verdict
                .map(|verdict| verdict.status.label().to_string())
                .unwrap_or_default(),
            error_type: verdict
                .map_or(ErrorCategory::NoError, |verdict| verdict.error_type)
                .label()
                .to_string(),
            error_explanation: explanation.to_string(),
            recommended_action: verdict
                .map(|verdict| verdict.recommended_action.clone())
                .unwrap_or_default(),
        }
    }
}

/// Error raised by the adjudication service.
#[derive(Debug, thiserror::Error)]
pub enum AdjudicationError {
    #[error("no claims found for tenant {0}")]
    NoClaims(TenantId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
