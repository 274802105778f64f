use std::collections::{BTreeMap, BTreeSet};

use super::domain::{
    CategoryMetric, ErrorCategory, ErrorType, ValidationStatus, Verdict, Violation,
};

pub const NEGATIVE_AMOUNT_EXPLANATION: &str =
    "Paid amount is negative; possible refund or data error.";
pub const NEGATIVE_AMOUNT_ACTION: &str = "Investigate payment record; correct negative amount";

/// Folds one claim's violations into a verdict.
pub struct ResultAggregator;

impl ResultAggregator {
    pub fn verdict(mut violations: Vec<Violation>, paid_amount: Option<f64>) -> Verdict {
        if violations.is_empty() {
            if paid_amount.unwrap_or(0.0) < 0.0 {
                violations.push(Violation::technical(
                    NEGATIVE_AMOUNT_EXPLANATION,
                    NEGATIVE_AMOUNT_ACTION,
                ));
            } else {
                return Verdict::validated();
            }
        }

        let explanation = violations
            .iter()
            .map(|violation| format!("- {}", violation.explanation))
            .collect::<Vec<_>>()
            .join("\n");

        let mut seen = BTreeSet::new();
        let recommended_action = violations
            .iter()
            .map(|violation| violation.recommended_action.as_str())
            .filter(|action| seen.insert(*action))
            .collect::<Vec<_>>()
            .join("; ");

        Verdict {
            status: ValidationStatus::NotValidated,
            error_type: categorize(&violations),
            explanation,
            recommended_action,
        }
    }
}

/// Category from the set of distinct error types; anything but a single
/// medical or technical type is `Both`.
pub fn categorize(violations: &[Violation]) -> ErrorCategory {
    let kinds: BTreeSet<&ErrorType> = violations
        .iter()
        .map(|violation| &violation.error_type)
        .collect();

    match kinds.len() {
        0 => ErrorCategory::NoError,
        1 => match kinds.into_iter().next() {
            Some(ErrorType::Medical) => ErrorCategory::Medical,
            Some(ErrorType::Technical) => ErrorCategory::Technical,
            _ => ErrorCategory::Both,
        },
        _ => ErrorCategory::Both,
    }
}

/// Per-tenant count and paid-amount rollup, rebuilt on every run.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTally {
    buckets: BTreeMap<ErrorCategory, (u64, f64)>,
}

impl Default for CategoryTally {
    fn default() -> Self {
        let buckets = ErrorCategory::ALL
            .into_iter()
            .map(|category| (category, (0, 0.0)))
            .collect();
        Self { buckets }
    }
}

impl CategoryTally {
    pub fn record(&mut self, category: ErrorCategory, paid_amount: Option<f64>) {
        let bucket = self.buckets.entry(category).or_insert((0, 0.0));
        bucket.0 += 1;
        bucket.1 += paid_amount.filter(|value| value.is_finite()).unwrap_or(0.0);
    }

    pub fn count(&self, category: ErrorCategory) -> u64 {
        self.buckets.get(&category).map_or(0, |bucket| bucket.0)
    }

    pub fn total_paid(&self, category: ErrorCategory) -> f64 {
        self.buckets.get(&category).map_or(0.0, |bucket| bucket.1)
    }

    pub fn into_metrics(self) -> Vec<CategoryMetric> {
        self.buckets
            .into_iter()
            .map(|(category, (count, total_paid))| CategoryMetric {
                category,
                count,
                total_paid,
            })
            .collect()
    }
}
