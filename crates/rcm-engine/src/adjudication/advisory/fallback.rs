use std::collections::HashSet;

use async_trait::async_trait;

use super::{AdvisoryContext, AdvisoryTier, TierOutcome};
use crate::adjudication::domain::{Claim, Violation};
use crate::adjudication::rules::{as_number, render, Rule};
use crate::adjudication::tables::{self, DEFAULT_APPROVAL_THRESHOLD};

const AMOUNT_CUES: [&str; 5] = ["amount", "threshold", "paid", "cap", "limit"];

/// Second rung: mirror coarse textual cues found in the tenant's own rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleCueTier;

#[async_trait]
impl AdvisoryTier for RuleCueTier {
    fn name(&self) -> &'static str {
        "rule_cues"
    }

    async fn advise(&self, claim: &Claim, context: &AdvisoryContext) -> TierOutcome {
        let mut findings = Vec::new();
        for rule in context.rules() {
            findings.extend(cue_findings(rule, claim));
        }
        TierOutcome::from(dedup_by_explanation(findings))
    }
}

fn cue_text(rule: &Rule) -> String {
    format!(
        "{} {} {} {}",
        rule.field,
        rule.condition,
        render(&rule.value),
        rule.explanation
    )
    .to_lowercase()
}

fn cue_findings(rule: &Rule, claim: &Claim) -> Vec<Violation> {
    let text = cue_text(rule);
    let action = |default: &str| {
        if rule.recommended_action.trim().is_empty() {
            default.to_string()
        } else {
            rule.recommended_action.clone()
        }
    };
    let mut findings = Vec::new();

    if text.contains("approval") && !claim.has_approval() {
        findings.push(Violation::technical(
            format!(
                "Rule {} expects an approval number but none is present",
                rule.rule_id
            ),
            action("Obtain prior approval before processing"),
        ));
    }

    let service = claim.service();
    if text.contains("inpatient") && tables::is_inpatient_typed(service) && !claim.is_inpatient()
    {
        findings.push(Violation::technical(
            format!(
                "Rule {} concerns inpatient care but service {service} was billed as {}",
                rule.rule_id,
                display_encounter(claim)
            ),
            action("Confirm encounter type and clinical justification"),
        ));
    }

    if AMOUNT_CUES.iter().any(|cue| text.contains(cue)) && !claim.has_approval() {
        let threshold = as_number(&rule.value)
            .filter(|value| value.is_finite() && *value > 0.0)
            .unwrap_or(DEFAULT_APPROVAL_THRESHOLD);
        let paid = claim.paid_or_zero();
        if paid > threshold {
            findings.push(Violation::technical(
                format!(
                    "Paid amount AED {paid} is above {threshold} referenced by rule {}",
                    rule.rule_id
                ),
                action("Verify prior approval and supporting documentation for high-value claims"),
            ));
        }
    }

    findings
}

/// Last rung: fixed checks that need nothing but the claim.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicTier;

#[async_trait]
impl AdvisoryTier for HeuristicTier {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn advise(&self, claim: &Claim, _context: &AdvisoryContext) -> TierOutcome {
        TierOutcome::from(heuristic_findings(claim))
    }
}

pub(crate) fn heuristic_findings(claim: &Claim) -> Vec<Violation> {
    let mut findings = Vec::new();
    let paid = claim.paid_or_zero();

    if paid > DEFAULT_APPROVAL_THRESHOLD && !claim.has_approval() {
        findings.push(Violation::technical(
            format!("Paid amount AED {paid} is high and typically requires review/approval."),
            "Verify prior approval and supporting documentation for high-value claims.",
        ));
    }

    let service = claim.service();
    if tables::is_inpatient_typed(service) && !claim.is_inpatient() {
        findings.push(Violation::technical(
            format!("Service {service} is commonly inpatient; check encounter type."),
            "Confirm encounter type and clinical justification.",
        ));
    }

    findings
}

fn display_encounter(claim: &Claim) -> &str {
    match claim.encounter() {
        "" => "an unspecified encounter",
        other => other,
    }
}

fn dedup_by_explanation(findings: Vec<Violation>) -> Vec<Violation> {
    let mut seen = HashSet::new();
    findings
        .into_iter()
        .filter(|finding| seen.insert(finding.explanation.clone()))
        .collect()
}
