use super::domain::{Claim, TenantConfig, Violation};
use super::tables::{self, DEFAULT_APPROVAL_THRESHOLD};

/// Applies the fixed domain registries, adjusted by tenant overrides.
///
/// Every check runs; a finding in one never suppresses another.
#[derive(Debug, Clone, Default)]
pub struct DomainRuleEvaluator {
    config: TenantConfig,
}

impl DomainRuleEvaluator {
    pub fn new(config: TenantConfig) -> Self {
        Self { config }
    }

    /// Effective approval threshold: numeric tenant override, else the default.
    pub fn approval_threshold(&self) -> f64 {
        self.config
            .approval_threshold()
            .unwrap_or(DEFAULT_APPROVAL_THRESHOLD)
    }

    pub fn evaluate(&self, claim: &Claim) -> Vec<Violation> {
        let mut violations = Vec::new();
        let diagnoses = claim.diagnoses();

        encounter_checks(claim, &mut violations);
        facility_checks(claim, &mut violations);
        diagnosis_service_checks(claim, &diagnoses, &mut violations);
        exclusive_diagnosis_checks(&diagnoses, &mut violations);
        approval_checks(claim, &diagnoses, &mut violations);
        self.amount_checks(claim, &mut violations);
        identifier_checks(claim, &mut violations);

        violations
    }

    fn amount_checks(&self, claim: &Claim, violations: &mut Vec<Violation>) {
        if claim.has_approval() {
            return;
        }
        let paid = claim.paid_or_zero();

        let threshold = self.approval_threshold();
        if paid > threshold {
            violations.push(Violation::technical(
                format!("Paid amount AED {paid} exceeds threshold {threshold}"),
                "Obtain approval for high-value claims",
            ));
        }

        let service = claim.service();
        let cap = self
            .config
            .paid_amount_caps()
            .into_iter()
            .find(|entry| entry.service == service);
        if let Some(entry) = cap {
            if entry.cap > 0.0 && paid > entry.cap {
                violations.push(Violation::technical(
                    format!(
                        "Paid amount AED {paid} exceeds cap {} for service {service}",
                        entry.cap
                    ),
                    "Verify service-specific cap or obtain approval",
                ));
            }
        }
    }
}

fn encounter_checks(claim: &Claim, violations: &mut Vec<Violation>) {
    let service = claim.service();
    if tables::is_inpatient_only(service) && !claim.is_inpatient() {
        violations.push(Violation::technical(
            format!(
                "Service {service} is inpatient-only but encounter is {}",
                claim.encounter()
            ),
            "Submit as inpatient encounter or change service code",
        ));
    }
    if tables::is_outpatient_only(service) && claim.is_inpatient() {
        violations.push(Violation::technical(
            format!("Service {service} is outpatient-only but encounter is inpatient"),
            "Submit as outpatient encounter or change service code",
        ));
    }
}

fn facility_checks(claim: &Claim, violations: &mut Vec<Violation>) {
    let facility_id = claim.facility();
    if facility_id.is_empty() {
        return;
    }
    let service = claim.service();

    match tables::facility_type(facility_id) {
        Some(kind) => {
            if !service.is_empty() && !kind.allows(service) {
                violations.push(Violation::technical(
                    format!(
                        "Service {service} is not allowed at facility type {}",
                        kind.label()
                    ),
                    format!(
                        "Perform service at appropriate facility or update facility type to support {service}"
                    ),
                ));
            }
        }
        None => violations.push(Violation::technical(
            format!("Unknown facility id {facility_id}"),
            "Verify facility registry and correct facility_id",
        )),
    }
}

fn diagnosis_service_checks(claim: &Claim, diagnoses: &[&str], violations: &mut Vec<Violation>) {
    let service = claim.service();
    for (diagnosis, required) in tables::DIAGNOSIS_REQUIRED_SERVICE {
        if diagnoses.contains(diagnosis) && service != *required {
            violations.push(Violation::medical(
                format!("Diagnosis {diagnosis} requires service {required}"),
                format!("Ensure service {required} is billed when diagnosis {diagnosis} is present"),
            ));
        }
    }
}

fn exclusive_diagnosis_checks(diagnoses: &[&str], violations: &mut Vec<Violation>) {
    for (first, second) in tables::MUTUALLY_EXCLUSIVE_DIAGNOSES {
        if diagnoses.contains(first) && diagnoses.contains(second) {
            violations.push(Violation::medical(
                format!("Diagnoses {first} and {second} are mutually exclusive"),
                "Review clinical documentation; remove incorrect diagnosis",
            ));
        }
    }
}

fn approval_checks(claim: &Claim, diagnoses: &[&str], violations: &mut Vec<Violation>) {
    if claim.has_approval() {
        return;
    }
    let service = claim.service();
    if tables::service_requires_approval(service) {
        violations.push(Violation::technical(
            format!("Service {service} requires prior approval"),
            "Obtain prior approval before processing",
        ));
    }
    for diagnosis in diagnoses {
        if tables::diagnosis_requires_approval(diagnosis) {
            violations.push(Violation::technical(
                format!("Diagnosis {diagnosis} requires prior approval"),
                "Obtain prior authorization before processing",
            ));
        }
    }
}

fn identifier_checks(claim: &Claim, violations: &mut Vec<Violation>) {
    let mut problems = Vec::new();

    let plain_ids = [
        ("national_id", &claim.national_id),
        ("member_id", &claim.member_id),
        ("facility_id", &claim.facility_id),
    ];
    for (name, value) in plain_ids {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            if !tables::is_id_segment(value) {
                problems.push(format!("{name} '{value}' must be uppercase alphanumeric"));
            }
        }
    }

    if let Some(unique_id) = claim.unique_id.as_deref().filter(|v| !v.is_empty()) {
        if !tables::is_unique_id(unique_id) {
            problems.push(format!(
                "unique_id '{unique_id}' must be 3 segments of uppercase alphanumeric separated by hyphens"
            ));
        }
    }

    if !problems.is_empty() {
        violations.push(Violation::technical(
            format!("Invalid identifier format: {}", problems.join("; ")),
            "Correct ID formats to uppercase alphanumeric and unique_id segments",
        ));
    }
}
