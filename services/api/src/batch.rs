use crate::infra::parse_config_pair;
use chrono::Utc;
use clap::Args;
use rcm_engine::adjudication::{
    parse_rules, AdjudicationError, AdjudicationService, AdvisoryProvider, ClaimImporter,
    ClaimStore, InMemoryTenantStore, RuleKind, RuleStore, TenantId, ValidationReport,
};
use rcm_engine::config::AppConfig;
use rcm_engine::error::AppError;
use rcm_engine::telemetry;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// Tenant the claims belong to
    #[arg(long)]
    pub(crate) tenant: String,
    /// Claims CSV export with a header row
    #[arg(long)]
    pub(crate) claims: PathBuf,
    /// Technical rules as a JSON document or pipe-delimited lines
    #[arg(long)]
    pub(crate) technical_rules: Option<PathBuf>,
    /// Medical rules as a JSON document or pipe-delimited lines
    #[arg(long)]
    pub(crate) medical_rules: Option<PathBuf>,
    /// Tenant setting applied before the run, as key=value (repeatable)
    #[arg(long = "config", value_name = "KEY=VALUE", value_parser = parse_config_pair)]
    pub(crate) overrides: Vec<(String, String)>,
    /// Emit the report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Debug, Serialize)]
struct BatchOutput<'a> {
    tenant_id: &'a str,
    generated_at: chrono::DateTime<Utc>,
    #[serde(flatten)]
    report: &'a ValidationReport,
}

pub(crate) async fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let tenant = TenantId(args.tenant);
    let store = Arc::new(InMemoryTenantStore::new());
    seed_tenant(
        &store,
        &tenant,
        Some(args.claims.as_path()),
        args.technical_rules.as_deref(),
        args.medical_rules.as_deref(),
        &args.overrides,
    )?;

    let advisory = Arc::new(AdvisoryProvider::from_config(
        &config.advisory,
        config.advisory.throttle(),
    ));
    let service = AdjudicationService::new(store, advisory, config.validation);
    let report = service.validate_tenant(&tenant).await?;

    if args.json {
        let output = BatchOutput {
            tenant_id: &tenant.0,
            generated_at: Utc::now(),
            report: &report,
        };
        let rendered = serde_json::to_string_pretty(&output).map_err(std::io::Error::other)?;
        println!("{rendered}");
    } else {
        print_report(&tenant, &report);
    }

    Ok(())
}

/// Load a tenant's claims, rule sets and settings from files into the store.
/// Returns the number of claims stored.
pub(crate) fn seed_tenant(
    store: &InMemoryTenantStore,
    tenant: &TenantId,
    claims: Option<&Path>,
    technical_rules: Option<&Path>,
    medical_rules: Option<&Path>,
    overrides: &[(String, String)],
) -> Result<usize, AppError> {
    let stored = match claims {
        Some(path) => {
            let claims = ClaimImporter::from_path(path)?;
            store
                .upsert_claims(tenant, claims)
                .map_err(AdjudicationError::from)?
        }
        None => 0,
    };
    load_rules(store, tenant, RuleKind::Technical, technical_rules)?;
    load_rules(store, tenant, RuleKind::Medical, medical_rules)?;
    for (key, value) in overrides {
        store
            .set_tenant_config(tenant, key, value)
            .map_err(AdjudicationError::from)?;
    }
    Ok(stored)
}

fn load_rules(
    store: &InMemoryTenantStore,
    tenant: &TenantId,
    kind: RuleKind,
    path: Option<&Path>,
) -> Result<(), AppError> {
    let Some(path) = path else {
        return Ok(());
    };

    let text = std::fs::read_to_string(path)?;
    let rules = parse_rules(&text)?;
    info!(tenant = %tenant, ?kind, rules = rules.len(), path = %path.display(), "loaded rules");
    store
        .save_rules(tenant, kind, rules)
        .map_err(AdjudicationError::from)?;
    Ok(())
}

fn print_report(tenant: &TenantId, report: &ValidationReport) {
    println!("Claim validation for tenant {tenant}");
    println!("Processed {} claims", report.processed);

    for outcome in &report.verdicts {
        let verdict = &outcome.verdict;
        println!(
            "- {}: {} ({})",
            outcome.claim_id.0,
            verdict.status.label(),
            verdict.error_type.label()
        );
        for line in verdict.explanation.lines().filter(|line| !line.is_empty()) {
            println!("    {line}");
        }
        if !verdict.recommended_action.is_empty() {
            println!("    Action: {}", verdict.recommended_action);
        }
    }

    println!("Category totals");
    for metric in &report.metrics {
        println!(
            "- {}: {} claims | AED {:.2}",
            metric.category.label(),
            metric.count,
            metric.total_paid
        );
    }
}
