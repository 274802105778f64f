use crate::adjudication::aggregate::{
    categorize, CategoryTally, ResultAggregator, NEGATIVE_AMOUNT_EXPLANATION,
};
use crate::adjudication::domain::{
    ErrorCategory, ErrorType, ValidationStatus, Verdict, Violation,
};

fn other(label: &str) -> Violation {
    Violation {
        error_type: ErrorType::Other(label.to_string()),
        explanation: format!("{label} finding"),
        recommended_action: "Escalate".to_string(),
    }
}

#[test]
fn category_follows_distinct_error_types() {
    let medical = Violation::medical("m", "a");
    let technical = Violation::technical("t", "b");

    assert_eq!(categorize(&[]), ErrorCategory::NoError);
    assert_eq!(
        categorize(&[medical.clone(), medical.clone()]),
        ErrorCategory::Medical
    );
    assert_eq!(categorize(&[technical.clone()]), ErrorCategory::Technical);
    assert_eq!(
        categorize(&[medical.clone(), technical.clone()]),
        ErrorCategory::Both
    );
    assert_eq!(categorize(&[other("Billing")]), ErrorCategory::Both);
    assert_eq!(categorize(&[technical, other("Billing")]), ErrorCategory::Both);
}

#[test]
fn empty_violations_with_non_negative_amount_validate() {
    assert_eq!(ResultAggregator::verdict(Vec::new(), Some(0.0)), Verdict::validated());
    assert_eq!(ResultAggregator::verdict(Vec::new(), None), Verdict::validated());
}

#[test]
fn negative_amount_alone_is_a_technical_error() {
    let verdict = ResultAggregator::verdict(Vec::new(), Some(-10.0));
    assert_eq!(verdict.status, ValidationStatus::NotValidated);
    assert_eq!(verdict.error_type, ErrorCategory::Technical);
    assert_eq!(verdict.explanation, format!("- {NEGATIVE_AMOUNT_EXPLANATION}"));
    assert_eq!(
        verdict.recommended_action,
        "Investigate payment record; correct negative amount"
    );
}

#[test]
fn negative_amount_is_not_added_to_existing_findings() {
    let verdict = ResultAggregator::verdict(vec![Violation::medical("m", "a")], Some(-10.0));
    assert_eq!(verdict.error_type, ErrorCategory::Medical);
    assert_eq!(verdict.explanation, "- m");
}

#[test]
fn explanation_lines_keep_order_and_actions_collapse() {
    let verdict = ResultAggregator::verdict(
        vec![
            Violation::technical("first", "Obtain prior approval before processing"),
            Violation::medical("second", "Attach notes"),
            Violation::technical("third", "Obtain prior approval before processing"),
        ],
        Some(50.0),
    );

    assert_eq!(verdict.explanation, "- first\n- second\n- third");
    assert_eq!(
        verdict.recommended_action,
        "Obtain prior approval before processing; Attach notes"
    );
    assert_eq!(verdict.error_type, ErrorCategory::Both);
}

#[test]
fn tally_reports_every_category() {
    let mut tally = CategoryTally::default();
    tally.record(ErrorCategory::Technical, Some(120.5));
    tally.record(ErrorCategory::Technical, None);
    tally.record(ErrorCategory::NoError, Some(30.0));
    tally.record(ErrorCategory::NoError, Some(f64::NAN));

    assert_eq!(tally.count(ErrorCategory::Technical), 2);
    assert_eq!(tally.total_paid(ErrorCategory::Technical), 120.5);
    assert_eq!(tally.count(ErrorCategory::NoError), 2);
    assert_eq!(tally.total_paid(ErrorCategory::NoError), 30.0);

    let metrics = tally.into_metrics();
    assert_eq!(metrics.len(), 4);
    assert_eq!(metrics[0].category, ErrorCategory::NoError);
    assert_eq!(metrics[2].category, ErrorCategory::Technical);
    assert_eq!(metrics[1].count, 0);
}
