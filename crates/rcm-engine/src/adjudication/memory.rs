use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    CategoryMetric, Claim, ClaimId, RefinedEntry, TenantConfig, TenantId, Verdict,
};
use super::repository::{
    ClaimStore, DeletionCounts, MetricsStore, RepositoryError, RuleStore, StoredClaim, TenantAdmin,
};
use super::rules::{Rule, RuleKind};

#[derive(Debug, Default, Clone)]
struct TenantRecords {
    claims: Vec<StoredClaim>,
    technical_rules: Vec<Rule>,
    medical_rules: Vec<Rule>,
    config: TenantConfig,
    metrics: Vec<CategoryMetric>,
    refined: Vec<RefinedEntry>,
}

impl TenantRecords {
    fn is_empty(&self) -> bool {
        self.claims.is_empty()
            && self.technical_rules.is_empty()
            && self.medical_rules.is_empty()
            && self.config.0.is_empty()
            && self.metrics.is_empty()
            && self.refined.is_empty()
    }
}

/// Process-local store backing every tenant collection.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTenantStore {
    tenants: Arc<Mutex<HashMap<TenantId, TenantRecords>>>,
}

impl InMemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<TenantId, TenantRecords>>, RepositoryError> {
        self.tenants
            .lock()
            .map_err(|_| RepositoryError::Unavailable("tenant store mutex poisoned".to_string()))
    }

    fn read<T>(
        &self,
        tenant: &TenantId,
        view: impl FnOnce(&TenantRecords) -> T,
    ) -> Result<T, RepositoryError> {
        let guard = self.lock()?;
        let empty = TenantRecords::default();
        Ok(view(guard.get(tenant).unwrap_or(&empty)))
    }

    fn write<T>(
        &self,
        tenant: &TenantId,
        change: impl FnOnce(&mut TenantRecords) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut guard = self.lock()?;
        change(guard.entry(tenant.clone()).or_default())
    }
}

impl RuleStore for InMemoryTenantStore {
    fn fetch_rules(
        &self,
        tenant: &TenantId,
        kind: Option<RuleKind>,
    ) -> Result<Vec<Rule>, RepositoryError> {
        self.read(tenant, |records| match kind {
            Some(RuleKind::Technical) => records.technical_rules.clone(),
            Some(RuleKind::Medical) => records.medical_rules.clone(),
            None => records
                .technical_rules
                .iter()
                .chain(records.medical_rules.iter())
                .cloned()
                .collect(),
        })
    }

    fn save_rules(
        &self,
        tenant: &TenantId,
        kind: RuleKind,
        rules: Vec<Rule>,
    ) -> Result<(), RepositoryError> {
        self.write(tenant, |records| {
            match kind {
                RuleKind::Technical => records.technical_rules = rules,
                RuleKind::Medical => records.medical_rules = rules,
            }
            Ok(())
        })
    }

    fn tenant_config(
        &self,
        tenant: &TenantId,
        key: &str,
    ) -> Result<Option<String>, RepositoryError> {
        self.read(tenant, |records| records.config.get(key).map(str::to_string))
    }

    fn set_tenant_config(
        &self,
        tenant: &TenantId,
        key: &str,
        value: &str,
    ) -> Result<(), RepositoryError> {
        self.write(tenant, |records| {
            records.config.insert(key, value);
            Ok(())
        })
    }

    fn list_tenant_config(&self, tenant: &TenantId) -> Result<TenantConfig, RepositoryError> {
        self.read(tenant, |records| records.config.clone())
    }
}

impl ClaimStore for InMemoryTenantStore {
    fn fetch_claims(&self, tenant: &TenantId) -> Result<Vec<StoredClaim>, RepositoryError> {
        self.read(tenant, |records| records.claims.clone())
    }

    fn upsert_claims(
        &self,
        tenant: &TenantId,
        claims: Vec<Claim>,
    ) -> Result<usize, RepositoryError> {
        self.write(tenant, |records| {
            let count = claims.len();
            for claim in claims {
                match records
                    .claims
                    .iter_mut()
                    .find(|stored| stored.claim.claim_id == claim.claim_id)
                {
                    Some(stored) => *stored = StoredClaim::from(claim),
                    None => records.claims.push(StoredClaim::from(claim)),
                }
            }
            Ok(count)
        })
    }

    fn update_claim_verdict(
        &self,
        tenant: &TenantId,
        claim_id: &ClaimId,
        verdict: &Verdict,
    ) -> Result<(), RepositoryError> {
        self.write(tenant, |records| {
            let stored = records
                .claims
                .iter_mut()
                .find(|stored| &stored.claim.claim_id == claim_id)
                .ok_or(RepositoryError::NotFound)?;
            stored.verdict = Some(verdict.clone());
            Ok(())
        })
    }
}

impl MetricsStore for InMemoryTenantStore {
    fn save_metrics(
        &self,
        tenant: &TenantId,
        metrics: &[CategoryMetric],
    ) -> Result<(), RepositoryError> {
        self.write(tenant, |records| {
            records.metrics = metrics.to_vec();
            Ok(())
        })
    }

    fn fetch_metrics(&self, tenant: &TenantId) -> Result<Vec<CategoryMetric>, RepositoryError> {
        self.read(tenant, |records| records.metrics.clone())
    }

    fn append_refined(
        &self,
        tenant: &TenantId,
        entries: Vec<RefinedEntry>,
    ) -> Result<(), RepositoryError> {
        self.write(tenant, |records| {
            records.refined.extend(entries);
            Ok(())
        })
    }

    fn fetch_refined(&self, tenant: &TenantId) -> Result<Vec<RefinedEntry>, RepositoryError> {
        self.read(tenant, |records| records.refined.clone())
    }
}

impl TenantAdmin for InMemoryTenantStore {
    fn delete_tenant(&self, tenant: &TenantId) -> Result<DeletionCounts, RepositoryError> {
        let mut guard = self.lock()?;
        let Some(records) = guard.remove(tenant) else {
            return Ok(DeletionCounts::default());
        };
        if records.is_empty() {
            return Ok(DeletionCounts::default());
        }

        Ok(DeletionCounts {
            claims: records.claims.len(),
            rules: records.technical_rules.len() + records.medical_rules.len(),
            config: records.config.0.len(),
            metrics: records.metrics.len(),
            refined: records.refined.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> TenantId {
        TenantId("clinic-a".to_string())
    }

    #[test]
    fn upsert_replaces_claims_with_same_id() {
        let store = InMemoryTenantStore::new();
        let mut claim = Claim::new("C-1");
        store
            .upsert_claims(&tenant(), vec![claim.clone(), Claim::new("C-2")])
            .expect("insert");
        store
            .update_claim_verdict(&tenant(), &claim.claim_id, &Verdict::validated())
            .expect("verdict");

        claim.service_code = Some("SRV2001".to_string());
        store.upsert_claims(&tenant(), vec![claim]).expect("upsert");

        let claims = store.fetch_claims(&tenant()).expect("fetch");
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].claim.service(), "SRV2001");
        assert_eq!(claims[0].verdict, None);
    }

    #[test]
    fn verdict_for_unknown_claim_is_not_found() {
        let store = InMemoryTenantStore::new();
        let err = store
            .update_claim_verdict(&tenant(), &ClaimId("nope".into()), &Verdict::validated())
            .expect_err("claim missing");
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[test]
    fn tenants_are_isolated_and_deletion_counts_records() {
        let store = InMemoryTenantStore::new();
        let other = TenantId("clinic-b".to_string());
        store
            .upsert_claims(&tenant(), vec![Claim::new("C-1")])
            .expect("insert");
        store
            .set_tenant_config(&tenant(), "paid_amount_approval_threshold", "400")
            .expect("config");
        store
            .upsert_claims(&other, vec![Claim::new("C-9")])
            .expect("insert other");

        let counts = store.delete_tenant(&tenant()).expect("delete");
        assert_eq!(counts.claims, 1);
        assert_eq!(counts.config, 1);
        assert!(store.fetch_claims(&tenant()).expect("fetch").is_empty());
        assert_eq!(store.fetch_claims(&other).expect("fetch other").len(), 1);
        assert_eq!(
            store.delete_tenant(&tenant()).expect("second delete"),
            DeletionCounts::default()
        );
    }
}
