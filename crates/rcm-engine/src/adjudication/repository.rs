use serde::{Deserialize, Serialize};

use super::domain::{
    CategoryMetric, Claim, ClaimId, RefinedEntry, TenantConfig, TenantId, Verdict,
};
use super::rules::{Rule, RuleKind};

/// Tenant rule sets and configuration overrides.
pub trait RuleStore: Send + Sync {
    /// Rules in upload order; `None` returns technical rules before medical ones.
    fn fetch_rules(
        &self,
        tenant: &TenantId,
        kind: Option<RuleKind>,
    ) -> Result<Vec<Rule>, RepositoryError>;
    /// Replace the tenant's rules of one kind.
    fn save_rules(
        &self,
        tenant: &TenantId,
        kind: RuleKind,
        rules: Vec<Rule>,
    ) -> Result<(), RepositoryError>;
    fn tenant_config(&self, tenant: &TenantId, key: &str)
        -> Result<Option<String>, RepositoryError>;
    fn set_tenant_config(
        &self,
        tenant: &TenantId,
        key: &str,
        value: &str,
    ) -> Result<(), RepositoryError>;
    fn list_tenant_config(&self, tenant: &TenantId) -> Result<TenantConfig, RepositoryError>;
}

/// Claim records and their verdict columns.
pub trait ClaimStore: Send + Sync {
    fn fetch_claims(&self, tenant: &TenantId) -> Result<Vec<StoredClaim>, RepositoryError>;
    /// Insert new claims or overwrite existing ones with the same id.
    fn upsert_claims(&self, tenant: &TenantId, claims: Vec<Claim>)
        -> Result<usize, RepositoryError>;
    fn update_claim_verdict(
        &self,
        tenant: &TenantId,
        claim_id: &ClaimId,
        verdict: &Verdict,
    ) -> Result<(), RepositoryError>;
}

/// Category metrics and the refined audit trail.
pub trait MetricsStore: Send + Sync {
    /// Replace every metric row for the tenant.
    fn save_metrics(
        &self,
        tenant: &TenantId,
        metrics: &[CategoryMetric],
    ) -> Result<(), RepositoryError>;
    fn fetch_metrics(&self, tenant: &TenantId) -> Result<Vec<CategoryMetric>, RepositoryError>;
    fn append_refined(
        &self,
        tenant: &TenantId,
        entries: Vec<RefinedEntry>,
    ) -> Result<(), RepositoryError>;
    fn fetch_refined(&self, tenant: &TenantId) -> Result<Vec<RefinedEntry>, RepositoryError>;
}

/// Removes every record a tenant owns.
pub trait TenantAdmin: Send + Sync {
    fn delete_tenant(&self, tenant: &TenantId) -> Result<DeletionCounts, RepositoryError>;
}

/// A claim together with the verdict last written for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredClaim {
    pub claim: Claim,
    pub verdict: Option<Verdict>,
}

impl From<Claim> for StoredClaim {
    fn from(claim: Claim) -> Self {
        Self {
            claim,
            verdict: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionCounts {
    pub claims: usize,
    pub rules: usize,
    pub config: usize,
    pub metrics: usize,
    pub refined: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
